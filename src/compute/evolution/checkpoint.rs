//! JSON checkpoints of populations and random stream state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::schema::{CheckpointConfig, EvolutionHistory};

use super::{EaRng, Population};

/// Checkpoint errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Checkpoint encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Checkpoint does not match configuration: {0}")]
    Mismatch(String),
}

/// Complete resumable state of one evolutionary algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EaCheckpoint {
    /// Updates completed.
    pub update: u64,
    /// Next individual id to hand out.
    pub next_id: u64,
    pub evaluations: u64,
    /// Best scalar fitness seen so far.
    pub best_fitness: Option<f64>,
    /// Updates since the best fitness last improved.
    pub stagnation: u64,
    pub rng: EaRng,
    pub population: Population,
    #[serde(default)]
    pub history: EvolutionHistory,
}

/// File a checkpoint for `update` is written to.
pub fn checkpoint_path(config: &CheckpointConfig, update: u64) -> PathBuf {
    let file = format!("{}-{update}.json", config.prefix);
    match &config.directory {
        Some(dir) => Path::new(dir).join(file),
        None => PathBuf::from(file),
    }
}

/// Serialize any checkpoint to pretty JSON, creating parent directories.
pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), CheckpointError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a checkpoint written by [`save_json`].
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, CheckpointError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Most recent checkpoint matching the configured prefix, by update number.
pub fn latest_checkpoint(config: &CheckpointConfig) -> io::Result<Option<PathBuf>> {
    let dir = config.directory.as_deref().unwrap_or(".");
    let prefix = format!("{}-", config.prefix);

    let mut best: Option<(u64, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let update = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(&prefix))
            .and_then(|n| n.strip_suffix(".json"))
            .and_then(|n| n.parse::<u64>().ok());
        if let Some(update) = update
            && best.as_ref().is_none_or(|(u, _)| update > *u)
        {
            best = Some((update, path));
        }
    }
    Ok(best.map(|(_, path)| path))
}
