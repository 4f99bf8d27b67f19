//! Meta-population (island model) configuration.

use serde::{Deserialize, Serialize};

use super::config::{apply_overrides, check_probability};
use super::{ConfigError, EaConfig};

/// Configuration of a collection of islands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaPopulationConfig {
    /// Number of islands.
    #[serde(default = "default_meta_size")]
    pub size: usize,
    /// Configuration shared by every island.
    #[serde(default)]
    pub island: EaConfig,
    /// Exchange policy between islands.
    #[serde(default)]
    pub model: MetaModel,
    /// Seed for the meta-level stream; island seeds derive from it.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for MetaPopulationConfig {
    fn default() -> Self {
        Self {
            size: default_meta_size(),
            island: EaConfig::default(),
            model: MetaModel::default(),
            random_seed: None,
        }
    }
}

fn default_meta_size() -> usize {
    4
}

/// Exchange policy between islands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MetaModel {
    /// Islands never exchange individuals.
    Isolated,
    /// Periodic migration along a topology.
    Migration(MigrationConfig),
    /// Quick hierarchical fair competition over fitness tiers.
    Qhfc(QhfcConfig),
}

impl Default for MetaModel {
    fn default() -> Self {
        Self::Migration(MigrationConfig::default())
    }
}

/// How islands are connected for migration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MigrationTopology {
    /// Each island sends to the next (circular).
    #[default]
    Ring,
    /// A fresh random ring every migration.
    RandomRing,
}

/// Which individuals leave an island.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EmigrantSelection {
    #[default]
    Random,
    Best,
}

/// Whether emigrants leave their island.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MigrationMode {
    /// Emigrants leave; immigrants take their slots.
    #[default]
    Move,
    /// Emigrants stay; immigrants replace random residents.
    Copy,
}

/// Migration schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Updates between migrations.
    #[serde(default = "default_migration_period")]
    pub period: u64,
    /// Fraction of each island that migrates.
    #[serde(default = "default_migration_rate")]
    pub rate: f64,
    #[serde(default)]
    pub topology: MigrationTopology,
    #[serde(default)]
    pub emigrants: EmigrantSelection,
    #[serde(default)]
    pub mode: MigrationMode,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            period: default_migration_period(),
            rate: default_migration_rate(),
            topology: MigrationTopology::default(),
            emigrants: EmigrantSelection::default(),
            mode: MigrationMode::default(),
        }
    }
}

fn default_migration_period() -> u64 {
    10
}
fn default_migration_rate() -> f64 {
    0.05
}

impl MigrationConfig {
    /// Number of migrants per island for a given island size.
    pub fn migrants(&self, island_size: usize) -> usize {
        (self.rate * island_size as f64).round() as usize
    }
}

/// QHFC tier management settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QhfcConfig {
    /// The top tier breeds an extra update every N updates.
    #[serde(default = "default_breed_top_freq")]
    pub breed_top_freq: u64,
    /// Individuals per tier inspected for export each update.
    #[serde(default = "default_detect_export_num")]
    pub detect_export_num: usize,
    /// Share of a stagnant island replaced: random individuals at the base
    /// tier, the best of the tier below on upper tiers.
    #[serde(default = "default_percent_refill")]
    pub percent_refill: f64,
    /// Admission thresholds are recomputed every N updates.
    #[serde(default = "default_catchup_gen")]
    pub catchup_gen: u64,
    /// Updates without improvement before an island is refilled.
    #[serde(default = "default_no_progress_gen")]
    pub no_progress_gen: u64,
}

impl Default for QhfcConfig {
    fn default() -> Self {
        Self {
            breed_top_freq: default_breed_top_freq(),
            detect_export_num: default_detect_export_num(),
            percent_refill: default_percent_refill(),
            catchup_gen: default_catchup_gen(),
            no_progress_gen: default_no_progress_gen(),
        }
    }
}

fn default_breed_top_freq() -> u64 {
    3
}
fn default_detect_export_num() -> usize {
    3
}
fn default_percent_refill() -> f64 {
    0.25
}
fn default_catchup_gen() -> u64 {
    10
}
fn default_no_progress_gen() -> u64 {
    20
}

impl QhfcConfig {
    /// Number of individuals refilled on a stagnant island.
    pub fn refill_count(&self, island_size: usize) -> usize {
        ((self.percent_refill * island_size as f64).ceil() as usize).min(island_size)
    }
}

impl MetaPopulationConfig {
    /// Validate meta-level and island settings. Fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.island.validate()?;
        let island_size = self.island.population.size;

        match &self.model {
            MetaModel::Isolated => {
                if self.size == 0 {
                    return Err(ConfigError::TooFewIslands { min: 1 });
                }
            }
            MetaModel::Migration(migration) => {
                if self.size == 0 {
                    return Err(ConfigError::TooFewIslands { min: 1 });
                }
                if migration.period == 0 {
                    return Err(ConfigError::InvalidMigration(
                        "period must be at least 1".to_string(),
                    ));
                }
                if !migration.rate.is_finite() || migration.rate < 0.0 {
                    return Err(ConfigError::InvalidMigration(format!(
                        "rate {} must be non-negative",
                        migration.rate
                    )));
                }
                let count = migration.migrants(island_size);
                if count > island_size {
                    return Err(ConfigError::MigrationTooLarge {
                        count,
                        size: island_size,
                    });
                }
            }
            MetaModel::Qhfc(qhfc) => {
                if self.size < 2 {
                    return Err(ConfigError::TooFewIslands { min: 2 });
                }
                check_probability("percent_refill", qhfc.percent_refill)?;
                if qhfc.breed_top_freq == 0 || qhfc.catchup_gen == 0 || qhfc.no_progress_gen == 0
                {
                    return Err(ConfigError::InvalidQhfc(
                        "periods must be at least 1".to_string(),
                    ));
                }
                if qhfc.detect_export_num > island_size {
                    return Err(ConfigError::InvalidQhfc(format!(
                        "cannot inspect {} of {island_size} individuals",
                        qhfc.detect_export_num
                    )));
                }
            }
        }

        Ok(())
    }

    /// Apply dotted-name overrides such as `island.population.size=50`.
    pub fn with_overrides<'a, I>(self, overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        apply_overrides(self, overrides)
    }
}
