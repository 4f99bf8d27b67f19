//! Meta-population: islands stepped in parallel with periodic exchange.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info};
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::compute::evolution::{
    CheckpointError, EaCheckpoint, EaRng, EngineError, EvolutionaryAlgorithm, FitnessFunction,
    checkpoint_path, load_json, save_json,
};
use crate::schema::{
    ConfigError, EvolutionHistory, MetaModel, MetaPopulationConfig, PopulationStats, RunSummary,
    StopReason,
};

use super::{QhfcState, exchange, migrate};

/// Bits reserved for each island's individual ids.
const ISLAND_ID_SHIFT: u32 = 40;

/// Read-only view handed to run callbacks once per meta update.
pub struct MetaUpdateEvent<'a> {
    pub update: u64,
    pub total_updates: u64,
    pub islands: &'a [EvolutionaryAlgorithm],
    /// Statistics over every island combined.
    pub stats: &'a PopulationStats,
}

/// Complete resumable state of a meta-population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCheckpoint {
    pub update: u64,
    pub rng: EaRng,
    pub best_fitness: Option<f64>,
    pub stagnation: u64,
    #[serde(default)]
    pub qhfc: Option<QhfcState>,
    pub islands: Vec<EaCheckpoint>,
    #[serde(default)]
    pub history: EvolutionHistory,
}

/// A collection of islands sharing one configuration.
pub struct MetaPopulation {
    config: MetaPopulationConfig,
    islands: Vec<EvolutionaryAlgorithm>,
    rng: EaRng,
    update: u64,
    qhfc: Option<QhfcState>,
    best_fitness: Option<f64>,
    stagnation: u64,
    history: EvolutionHistory,
    cancelled: Arc<AtomicBool>,
}

impl MetaPopulation {
    /// Validate the configuration and create empty islands.
    ///
    /// Island streams are drawn from the meta stream, so one seed fixes the
    /// whole run.
    pub fn new(
        config: MetaPopulationConfig,
        fitness: Arc<dyn FitnessFunction>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        config.island.model.check_objectives(fitness.objectives())?;
        let seed = config
            .random_seed
            .or(config.island.random_seed)
            .unwrap_or_else(rand::random);
        let mut rng = EaRng::seed_from_u64(seed);

        let islands = (0..config.size)
            .map(|i| {
                let island_rng = EaRng::seed_from_u64(rng.next_u64());
                EvolutionaryAlgorithm::with_rng(config.island.clone(), Arc::clone(&fitness), island_rng)
                    .with_id_base((i as u64) << ISLAND_ID_SHIFT)
            })
            .collect();

        let qhfc = match config.model {
            MetaModel::Qhfc(_) => Some(QhfcState::new(config.size)),
            _ => None,
        };

        Ok(Self {
            config,
            islands,
            rng,
            update: 0,
            qhfc,
            best_fitness: None,
            stagnation: 0,
            history: EvolutionHistory::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &MetaPopulationConfig {
        &self.config
    }

    pub fn islands(&self) -> &[EvolutionaryAlgorithm] {
        &self.islands
    }

    pub fn update(&self) -> u64 {
        self.update
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best_fitness
    }

    pub fn qhfc_state(&self) -> Option<&QhfcState> {
        self.qhfc.as_ref()
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    /// Total evaluations across islands.
    pub fn evaluations(&self) -> u64 {
        self.islands.iter().map(EvolutionaryAlgorithm::evaluations).sum()
    }

    /// Total individuals across islands.
    pub fn len(&self) -> usize {
        self.islands.iter().map(|i| i.population().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> PopulationStats {
        let per_island: Vec<PopulationStats> = self.islands.iter().map(|i| i.stats()).collect();
        combined_stats(&per_island, self.update)
    }

    /// Fill every island with evaluated ancestors, in parallel.
    pub fn initialize(&mut self) {
        self.islands.par_iter_mut().for_each(|island| island.initialize());
        self.track_best();
        debug!("initialized {} islands", self.islands.len());
    }

    /// One meta update: every island steps once, then the meta model exchanges.
    pub fn step(&mut self) -> PopulationStats {
        if self.islands.iter().any(|i| i.population().is_empty()) {
            self.initialize();
        }
        if let Some(state) = self.qhfc.as_mut()
            && !state.stratified
        {
            exchange(&mut self.islands, |populations| state.stratify(populations));
        }

        self.islands.par_iter_mut().for_each(|island| {
            island.step();
        });
        self.update += 1;

        match &self.config.model {
            MetaModel::Isolated => {}
            MetaModel::Migration(migration) => {
                if self.update % migration.period == 0 {
                    let rng = &mut self.rng;
                    exchange(&mut self.islands, |populations| {
                        migrate(populations, migration, rng)
                    });
                }
            }
            MetaModel::Qhfc(qhfc) => {
                if let Some(state) = self.qhfc.as_mut() {
                    state.after_update(qhfc, &mut self.islands, self.update);
                }
            }
        }

        self.track_best();
        let stats = self.stats();
        self.history.record(&stats);

        let period = self.config.island.run.recording_period.max(1);
        if self.update % period == 0 {
            info!(
                "meta update {}: best {:.4}, mean {:.4} over {} islands",
                stats.update,
                stats.best_fitness,
                stats.mean_fitness,
                self.islands.len()
            );
        }
        stats
    }

    fn track_best(&mut self) {
        let current = self
            .islands
            .iter()
            .filter_map(|i| i.top(1).first().map(|ind| ind.scalar_fitness()))
            .fold(None, |best: Option<f64>, f| Some(best.map_or(f, |b| b.max(f))));

        match (current, self.best_fitness) {
            (Some(c), Some(b)) if c <= b => self.stagnation += 1,
            (Some(c), _) => {
                self.best_fitness = Some(c);
                self.stagnation = 0;
            }
            (None, _) => {}
        }
    }

    fn should_stop(&self) -> Option<StopReason> {
        let run = &self.config.island.run;
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }
        if self.update >= run.total_updates() {
            return Some(StopReason::MaxUpdates);
        }
        if let Some(target) = run.target_fitness
            && self.best_fitness.is_some_and(|b| b >= target)
        {
            return Some(StopReason::TargetReached);
        }
        if let Some(limit) = run.stagnation_limit
            && self.stagnation >= limit
        {
            return Some(StopReason::Stagnation);
        }
        None
    }

    fn checkpoint_due(&self) -> bool {
        let checkpoint = &self.config.island.checkpoint;
        if !checkpoint.enabled || self.update == 0 {
            return false;
        }
        self.update % self.config.island.run.updates == 0
            || checkpoint.period.is_some_and(|p| self.update % p == 0)
    }

    /// Run to completion, invoking `callback` after every meta update.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<RunSummary, EngineError>
    where
        F: FnMut(&MetaUpdateEvent<'_>),
    {
        let start_time = Instant::now();
        let start_evaluations = self.evaluations();
        let total_updates = self.config.island.run.total_updates();

        if self.islands.iter().any(|i| i.population().is_empty()) {
            self.initialize();
        }

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            let stats = self.step();
            callback(&MetaUpdateEvent {
                update: self.update,
                total_updates,
                islands: &self.islands,
                stats: &stats,
            });

            if self.checkpoint_due() {
                let path = checkpoint_path(&self.config.island.checkpoint, self.update);
                self.save_checkpoint(&path)?;
                debug!("meta checkpoint written to {}", path.display());
            }
        };

        info!(
            "meta-population stopped at update {} ({:?})",
            self.update, stop_reason
        );
        Ok(RunSummary {
            updates: self.update,
            evaluations: self.evaluations() - start_evaluations,
            best_fitness: self.best_fitness.unwrap_or(f64::NEG_INFINITY),
            final_avg_fitness: self.stats().mean_fitness,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
            stop_reason,
        })
    }

    pub fn run(&mut self) -> Result<RunSummary, EngineError> {
        self.run_with_callback(|_| {})
    }

    pub fn checkpoint(&self) -> MetaCheckpoint {
        MetaCheckpoint {
            update: self.update,
            rng: self.rng.clone(),
            best_fitness: self.best_fitness,
            stagnation: self.stagnation,
            qhfc: self.qhfc.clone(),
            islands: self.islands.iter().map(EvolutionaryAlgorithm::checkpoint).collect(),
            history: self.history.clone(),
        }
    }

    /// Restore every island and the meta stream from a snapshot.
    pub fn restore(&mut self, checkpoint: MetaCheckpoint) -> Result<(), CheckpointError> {
        if checkpoint.islands.len() != self.islands.len() {
            return Err(CheckpointError::Mismatch(format!(
                "checkpoint holds {} islands, configuration expects {}",
                checkpoint.islands.len(),
                self.islands.len()
            )));
        }
        if checkpoint.qhfc.is_some() != self.qhfc.is_some() {
            return Err(CheckpointError::Mismatch(
                "checkpoint and configuration disagree on the meta model".to_string(),
            ));
        }

        for (island, state) in self.islands.iter_mut().zip(checkpoint.islands) {
            island.restore(state)?;
        }
        self.update = checkpoint.update;
        self.rng = checkpoint.rng;
        self.best_fitness = checkpoint.best_fitness;
        self.stagnation = checkpoint.stagnation;
        self.qhfc = checkpoint.qhfc;
        self.history = checkpoint.history;
        Ok(())
    }

    pub fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        save_json(&self.checkpoint(), path)
    }

    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CheckpointError> {
        let checkpoint: MetaCheckpoint = load_json(path)?;
        self.restore(checkpoint)
    }
}

/// Pool per-island statistics into one summary, weighting by island size.
pub fn combined_stats(islands: &[PopulationStats], update: u64) -> PopulationStats {
    let size: usize = islands.iter().map(|s| s.size).sum();
    if size == 0 {
        return PopulationStats {
            update,
            ..Default::default()
        };
    }

    let n = size as f64;
    let weighted = |f: fn(&PopulationStats) -> f64| {
        islands.iter().map(|s| f(s) * s.size as f64).sum::<f64>() / n
    };
    let mean = weighted(|s| s.mean_fitness);
    let second_moment = weighted(|s| s.fitness_std.powi(2) + s.mean_fitness.powi(2));

    PopulationStats {
        update,
        size,
        best_fitness: islands
            .iter()
            .filter(|s| s.size > 0)
            .map(|s| s.best_fitness)
            .fold(f64::NEG_INFINITY, f64::max),
        mean_fitness: mean,
        min_fitness: islands
            .iter()
            .filter(|s| s.size > 0)
            .map(|s| s.min_fitness)
            .fold(f64::INFINITY, f64::min),
        fitness_std: (second_moment - mean * mean).max(0.0).sqrt(),
        mean_genome_len: weighted(|s| s.mean_genome_len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::AllOnes;
    use crate::schema::{
        Ancestor, EaConfig, GenerationalModel, MigrationConfig, MigrationTopology, QhfcConfig,
        SelectionMethod, SiteMutation,
    };
    use std::collections::HashSet;

    fn island_config() -> EaConfig {
        let mut config = EaConfig::default();
        config.representation.initial_size = 32;
        config.representation.min_size = 32;
        config.representation.max_size = 32;
        config.representation.ancestor = Ancestor::RandomBitstring;
        config.mutation.site = SiteMutation::BitFlip;
        config.mutation.per_site_p = 0.03;
        config.population.size = 12;
        config.model = GenerationalModel::DeterministicCrowding;
        config.run.updates = 8;
        config
    }

    fn meta_config(model: MetaModel) -> MetaPopulationConfig {
        MetaPopulationConfig {
            size: 3,
            island: island_config(),
            model,
            random_seed: Some(17),
        }
    }

    fn migration() -> MetaModel {
        MetaModel::Migration(MigrationConfig {
            period: 2,
            rate: 0.25,
            topology: MigrationTopology::RandomRing,
            ..Default::default()
        })
    }

    fn ids(meta: &MetaPopulation) -> Vec<u64> {
        meta.islands()
            .iter()
            .flat_map(|i| i.population().iter().map(|ind| ind.id))
            .collect()
    }

    #[test]
    fn test_initialize_unique_ids() {
        let mut meta = MetaPopulation::new(meta_config(migration()), Arc::new(AllOnes)).unwrap();
        meta.initialize();
        assert_eq!(meta.len(), 36);
        let unique: HashSet<u64> = ids(&meta).into_iter().collect();
        assert_eq!(unique.len(), 36);
        assert!(ids(&meta).contains(&(2u64 << ISLAND_ID_SHIFT)));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = meta_config(migration());
        config.size = 0;
        assert!(MetaPopulation::new(config, Arc::new(AllOnes)).is_err());
    }

    #[test]
    fn test_migration_run_conserves_counts() {
        let mut meta = MetaPopulation::new(meta_config(migration()), Arc::new(AllOnes)).unwrap();
        let mut updates = Vec::new();
        let summary = meta
            .run_with_callback(|event| {
                assert!(event.islands.iter().all(|i| i.population().len() == 12));
                assert_eq!(event.stats.size, 36);
                updates.push(event.update);
            })
            .unwrap();
        assert_eq!(summary.updates, 8);
        assert_eq!(summary.stop_reason, StopReason::MaxUpdates);
        assert_eq!(updates, (1..=8).collect::<Vec<_>>());
        assert_eq!(meta.history().len(), 8);
    }

    #[test]
    fn test_same_seed_same_islands() {
        let run = || {
            let mut meta =
                MetaPopulation::new(meta_config(migration()), Arc::new(AllOnes)).unwrap();
            meta.run().unwrap();
            meta.islands()
                .iter()
                .map(|i| i.population().to_vec())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_isolated_islands_keep_their_ids() {
        let mut meta =
            MetaPopulation::new(meta_config(MetaModel::Isolated), Arc::new(AllOnes)).unwrap();
        meta.run().unwrap();
        for (index, island) in meta.islands().iter().enumerate() {
            assert!(
                island
                    .population()
                    .iter()
                    .all(|ind| ind.id >> ISLAND_ID_SHIFT == index as u64)
            );
        }
    }

    #[test]
    fn test_qhfc_run() {
        let mut config = meta_config(MetaModel::Qhfc(QhfcConfig {
            breed_top_freq: 2,
            detect_export_num: 2,
            percent_refill: 0.25,
            catchup_gen: 3,
            no_progress_gen: 4,
        }));
        config.island.model = GenerationalModel::Generational {
            selection: SelectionMethod::Tournament { size: 2 },
        };
        let mut meta = MetaPopulation::new(config, Arc::new(AllOnes)).unwrap();
        let summary = meta
            .run_with_callback(|event| {
                assert!(event.islands.iter().all(|i| i.population().len() == 12));
            })
            .unwrap();

        assert_eq!(summary.updates, 8);
        let state = meta.qhfc_state().unwrap();
        assert!(state.stratified);
        assert_eq!(state.admission.len(), 2);
        // The top tier breeds extra updates.
        assert!(meta.islands()[2].update() > meta.islands()[0].update());
    }

    #[test]
    fn test_checkpoint_resume_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let mut config = meta_config(migration());
        config.island.run.epochs = 2;

        let mut reference = MetaPopulation::new(config.clone(), Arc::new(AllOnes)).unwrap();
        reference.run().unwrap();

        let mut first = MetaPopulation::new(config.clone(), Arc::new(AllOnes)).unwrap();
        first.initialize();
        for _ in 0..5 {
            first.step();
        }
        first.save_checkpoint(&path).unwrap();

        let mut resumed = MetaPopulation::new(config, Arc::new(AllOnes)).unwrap();
        resumed.load_checkpoint(&path).unwrap();
        let summary = resumed.run().unwrap();

        assert_eq!(summary.updates, 16);
        for (a, b) in resumed.islands().iter().zip(reference.islands()) {
            assert_eq!(a.population(), b.population());
        }
        assert_eq!(resumed.history(), reference.history());
    }

    #[test]
    fn test_restore_rejects_island_count() {
        let meta = MetaPopulation::new(meta_config(migration()), Arc::new(AllOnes)).unwrap();
        let mut checkpoint = meta.checkpoint();
        checkpoint.islands.pop();

        let mut other = MetaPopulation::new(meta_config(migration()), Arc::new(AllOnes)).unwrap();
        assert!(matches!(
            other.restore(checkpoint),
            Err(CheckpointError::Mismatch(_))
        ));
    }

    #[test]
    fn test_combined_stats() {
        let a = PopulationStats {
            update: 1,
            size: 2,
            best_fitness: 3.0,
            mean_fitness: 2.0,
            min_fitness: 1.0,
            fitness_std: 1.0,
            mean_genome_len: 10.0,
        };
        let b = PopulationStats {
            update: 1,
            size: 2,
            best_fitness: 7.0,
            mean_fitness: 6.0,
            min_fitness: 5.0,
            fitness_std: 1.0,
            mean_genome_len: 20.0,
        };
        // Pooled values are 1, 3, 5, 7.
        let stats = combined_stats(&[a, b], 1);
        assert_eq!(stats.size, 4);
        assert_eq!(stats.best_fitness, 7.0);
        assert_eq!(stats.min_fitness, 1.0);
        assert!((stats.mean_fitness - 4.0).abs() < 1e-12);
        assert!((stats.fitness_std - 5.0f64.sqrt()).abs() < 1e-12);
        assert!((stats.mean_genome_len - 15.0).abs() < 1e-12);
    }
}
