//! Configuration types for a single evolutionary algorithm (one island).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{GenerationalModel, MarkovConfig, Recombination};

/// Top-level configuration for one population.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EaConfig {
    /// Genome shape and ancestor generation.
    #[serde(default)]
    pub representation: RepresentationConfig,
    /// Per-site and structural mutation settings.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// How parent genomes are combined.
    #[serde(default)]
    pub recombination: Recombination,
    /// Population size and evaluation policy.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Generational model advancing the population.
    #[serde(default)]
    pub model: GenerationalModel,
    /// Markov network layout and gate encoding.
    #[serde(default)]
    pub markov: MarkovConfig,
    /// Run length and reporting.
    #[serde(default)]
    pub run: RunConfig,
    /// Checkpoint settings.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Indexing scheme of a genome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GenomeTopology {
    /// Decode windows stop at the end of the genome.
    Linear,
    /// Decode windows wrap around the end of the genome.
    #[default]
    Circular,
}

/// How ancestral genomes are generated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type")]
pub enum Ancestor {
    /// Uniform codons drawn from the mutation codon range.
    RandomCodons,
    /// Uniform bits (codons 0 or 1).
    RandomBitstring,
    /// Random codons seeded with `markov.initial_gates` start codons.
    #[default]
    MarkovNetwork,
}

/// Genome representation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepresentationConfig {
    /// Linear or circular indexing.
    #[serde(default)]
    pub topology: GenomeTopology,
    /// Length of ancestral genomes.
    #[serde(default = "default_initial_size")]
    pub initial_size: usize,
    /// Minimum genome length.
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    /// Maximum genome length.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Ancestor generator.
    #[serde(default)]
    pub ancestor: Ancestor,
}

impl Default for RepresentationConfig {
    fn default() -> Self {
        Self {
            topology: GenomeTopology::default(),
            initial_size: default_initial_size(),
            min_size: default_min_size(),
            max_size: default_max_size(),
            ancestor: Ancestor::default(),
        }
    }
}

fn default_initial_size() -> usize {
    5000
}
fn default_min_size() -> usize {
    1000
}
fn default_max_size() -> usize {
    20000
}

/// Replacement value for a mutated site.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SiteMutation {
    /// Uniform draw from `codon_range`.
    #[default]
    UniformInt,
    /// Flip the low bit (bitstring genomes).
    BitFlip,
}

/// Mutation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Site replacement operator.
    #[serde(default)]
    pub site: SiteMutation,
    /// Per-site mutation probability.
    #[serde(default = "default_per_site_p")]
    pub per_site_p: f64,
    /// Inclusive range of codon values for uniform draws.
    #[serde(default = "default_codon_range")]
    pub codon_range: (u32, u32),
    /// Probability of a deletion event.
    #[serde(default = "default_indel_p")]
    pub deletion_p: f64,
    /// Probability of a duplication event.
    #[serde(default = "default_indel_p")]
    pub duplication_p: f64,
    /// Probability of an insertion event.
    #[serde(default)]
    pub insertion_p: f64,
    /// Minimum length of a structural edit.
    #[serde(default = "default_indel_min_size")]
    pub indel_min_size: usize,
    /// Maximum length of a structural edit.
    #[serde(default = "default_indel_max_size")]
    pub indel_max_size: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            site: SiteMutation::default(),
            per_site_p: default_per_site_p(),
            codon_range: default_codon_range(),
            deletion_p: default_indel_p(),
            duplication_p: default_indel_p(),
            insertion_p: 0.0,
            indel_min_size: default_indel_min_size(),
            indel_max_size: default_indel_max_size(),
        }
    }
}

fn default_per_site_p() -> f64 {
    0.005
}
fn default_codon_range() -> (u32, u32) {
    (0, 255)
}
fn default_indel_p() -> f64 {
    0.05
}
fn default_indel_min_size() -> usize {
    16
}
fn default_indel_max_size() -> usize {
    512
}

/// Population settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in the population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Re-evaluate every individual each update (for stochastic fitness).
    #[serde(default)]
    pub reevaluate: bool,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            reevaluate: false,
        }
    }
}

fn default_population_size() -> usize {
    100
}

/// Run length and reporting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Updates per epoch.
    #[serde(default = "default_run_updates")]
    pub updates: u64,
    /// Number of epochs.
    #[serde(default = "default_run_epochs")]
    pub epochs: u64,
    /// Log a fitness summary every N updates.
    #[serde(default = "default_recording_period")]
    pub recording_period: u64,
    /// Target fitness to stop early.
    #[serde(default)]
    pub target_fitness: Option<f64>,
    /// Stop if the best fitness has not improved for N updates.
    #[serde(default)]
    pub stagnation_limit: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            updates: default_run_updates(),
            epochs: default_run_epochs(),
            recording_period: default_recording_period(),
            target_fitness: None,
            stagnation_limit: None,
        }
    }
}

impl RunConfig {
    /// Total updates over all epochs.
    pub fn total_updates(&self) -> u64 {
        self.updates.saturating_mul(self.epochs)
    }
}

fn default_run_updates() -> u64 {
    100
}
fn default_run_epochs() -> u64 {
    1
}
fn default_recording_period() -> u64 {
    10
}

/// Checkpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Write checkpoints at all.
    #[serde(default)]
    pub enabled: bool,
    /// File name prefix.
    #[serde(default = "default_checkpoint_prefix")]
    pub prefix: String,
    /// Directory for checkpoint files (current directory if unset).
    #[serde(default)]
    pub directory: Option<String>,
    /// Additional checkpoint every N updates; epochs always end with one.
    #[serde(default)]
    pub period: Option<u64>,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            prefix: default_checkpoint_prefix(),
            directory: None,
            period: None,
        }
    }
}

fn default_checkpoint_prefix() -> String {
    "checkpoint".to_string()
}

// ============================================================================
// Validation
// ============================================================================

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("Probability {name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Invalid gate limits: {0}")]
    InvalidGateLimits(String),
    #[error("At least one gate kind with positive weight is required")]
    NoGateKinds,
    #[error("Gate table would need {bits} address bits (max {max})")]
    TableTooWide { bits: usize, max: usize },
    #[error("History pins require a history depth of at least 1")]
    MissingHistory,
    #[error("Markov network must have at least one state slot")]
    EmptyNetwork,
    #[error("Invalid generational model: {0}")]
    InvalidModel(String),
    #[error("Multi-objective model needs at least 2 objectives, fitness has {0}")]
    TooFewObjectives(usize),
    #[error("Run length must be positive")]
    InvalidRunLength,
    #[error("Meta-population must contain at least {min} islands")]
    TooFewIslands { min: usize },
    #[error("Migration moves {count} individuals but islands hold {size}")]
    MigrationTooLarge { count: usize, size: usize },
    #[error("Invalid migration settings: {0}")]
    InvalidMigration(String),
    #[error("Invalid QHFC settings: {0}")]
    InvalidQhfc(String),
    #[error("Unknown option {0}")]
    UnknownOption(String),
    #[error("Invalid value for option {key}: {reason}")]
    InvalidOverride { key: String, reason: String },
}

pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { name, value })
    }
}

pub(crate) fn check_order<T: PartialOrd + std::fmt::Display>(
    min: T,
    max: T,
    name: &str,
) -> Result<(), ConfigError> {
    if min > max {
        Err(ConfigError::InvalidBounds(format!(
            "{name} min ({min}) > max ({max})"
        )))
    } else {
        Ok(())
    }
}

impl RepresentationConfig {
    /// Validate genome length bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_order(self.min_size, self.max_size, "genome size")?;
        if self.initial_size < self.min_size || self.initial_size > self.max_size {
            return Err(ConfigError::InvalidBounds(format!(
                "initial genome size {} outside [{}, {}]",
                self.initial_size, self.min_size, self.max_size
            )));
        }
        if self.max_size == 0 {
            return Err(ConfigError::InvalidBounds(
                "maximum genome size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl MutationConfig {
    /// Validate probabilities and size bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("per_site_p", self.per_site_p)?;
        check_probability("deletion_p", self.deletion_p)?;
        check_probability("duplication_p", self.duplication_p)?;
        check_probability("insertion_p", self.insertion_p)?;
        check_order(self.codon_range.0, self.codon_range.1, "codon range")?;
        check_order(self.indel_min_size, self.indel_max_size, "indel size")?;
        if self.indel_min_size == 0 {
            return Err(ConfigError::InvalidBounds(
                "indel minimum size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl EaConfig {
    /// Validate the whole configuration. Fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.size < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }
        self.representation.validate()?;
        self.mutation.validate()?;
        self.markov.validate()?;
        self.model.validate(self.population.size)?;

        if self.run.updates == 0 || self.run.epochs == 0 {
            return Err(ConfigError::InvalidRunLength);
        }
        if let Some(0) = self.checkpoint.period {
            return Err(ConfigError::InvalidRunLength);
        }

        Ok(())
    }

    /// Apply dotted-name overrides such as `population.size=200`.
    pub fn with_overrides<'a, I>(self, overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        apply_overrides(self, overrides)
    }
}

/// Rewrite named options of a serializable configuration.
///
/// Keys are dotted paths into the JSON form of the configuration. Values are
/// parsed as JSON first and fall back to plain strings.
pub(crate) fn apply_overrides<'a, T, I>(config: T, overrides: I) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut value = serde_json::to_value(&config).map_err(|e| ConfigError::InvalidOverride {
        key: String::new(),
        reason: e.to_string(),
    })?;

    let mut last_key = String::new();
    for (key, raw) in overrides {
        let pointer = format!("/{}", key.replace('.', "/"));
        let slot = value
            .pointer_mut(&pointer)
            .ok_or_else(|| ConfigError::UnknownOption(key.to_string()))?;
        *slot = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        last_key = key.to_string();
    }

    serde_json::from_value(value).map_err(|e| ConfigError::InvalidOverride {
        key: last_key,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = EaConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_genome_bounds() {
        let mut config = EaConfig::default();
        config.representation.min_size = 500;
        config.representation.max_size = 100;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_rejects_bad_probability() {
        let mut config = EaConfig::default();
        config.mutation.per_site_p = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let config = EaConfig::default()
            .with_overrides([
                ("population.size", "200"),
                ("random_seed", "7"),
                ("representation.topology", "Linear"),
            ])
            .unwrap();
        assert_eq!(config.population.size, 200);
        assert_eq!(config.random_seed, Some(7));
        assert_eq!(config.representation.topology, GenomeTopology::Linear);
    }

    #[test]
    fn test_unknown_override() {
        let result = EaConfig::default().with_overrides([("population.colour", "red")]);
        assert!(matches!(result, Err(ConfigError::UnknownOption(_))));
    }

    #[test]
    fn test_serialization() {
        let config = EaConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EaConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.population.size, config.population.size);
        assert_eq!(parsed.markov.start_codon, config.markov.start_codon);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let parsed: EaConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.population.size, 100);
        assert!(parsed.validate().is_ok());
    }
}
