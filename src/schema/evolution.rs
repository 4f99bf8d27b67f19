//! Generational model configuration and run-progress types.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use super::config::check_probability;

/// Generational model advancing a population by one update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GenerationalModel {
    /// Steady-state: a few offspring replace a few victims per update.
    DeathBirth {
        /// Parent selection.
        #[serde(default = "default_parent_selection")]
        selection: SelectionMethod,
        /// Victim selection.
        #[serde(default)]
        victim: VictimSelection,
        /// Fraction of the population replaced per update.
        #[serde(default = "default_replacement_rate")]
        replacement_rate: f64,
    },
    /// Full replacement by offspring of selected parents.
    Generational {
        #[serde(default)]
        selection: SelectionMethod,
    },
    /// Offspring only compete against their more similar parent.
    DeterministicCrowding,
    /// Multi-objective selection by Pareto rank and crowding distance.
    Nsga2 {
        #[serde(default = "default_nsga_tournament")]
        tournament_size: usize,
    },
    /// Carries the top individuals over unmodified around another model.
    Elitism {
        #[serde(default = "default_elites")]
        elites: usize,
        model: Box<GenerationalModel>,
    },
}

impl Default for GenerationalModel {
    fn default() -> Self {
        Self::DeathBirth {
            selection: default_parent_selection(),
            victim: VictimSelection::default(),
            replacement_rate: default_replacement_rate(),
        }
    }
}

fn default_parent_selection() -> SelectionMethod {
    SelectionMethod::Proportionate
}
fn default_replacement_rate() -> f64 {
    0.05
}
fn default_nsga_tournament() -> usize {
    2
}
fn default_elites() -> usize {
    1
}

impl GenerationalModel {
    /// Validate model parameters against the population size.
    pub fn validate(&self, population_size: usize) -> Result<(), ConfigError> {
        match self {
            Self::DeathBirth {
                selection,
                replacement_rate,
                ..
            } => {
                check_probability("replacement_rate", *replacement_rate)?;
                if *replacement_rate <= 0.0 {
                    return Err(ConfigError::InvalidModel(
                        "replacement rate must be positive".to_string(),
                    ));
                }
                selection.validate(population_size)
            }
            Self::Generational { selection } => selection.validate(population_size),
            Self::DeterministicCrowding => Ok(()),
            Self::Nsga2 { tournament_size } => {
                if *tournament_size == 0 {
                    return Err(ConfigError::InvalidModel(
                        "NSGA-II tournament size must be at least 1".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Elitism { elites, model } => {
                if *elites >= population_size {
                    return Err(ConfigError::InvalidModel(format!(
                        "elitism keeps {elites} of {population_size} individuals"
                    )));
                }
                if matches!(**model, Self::Elitism { .. }) {
                    return Err(ConfigError::InvalidModel(
                        "elitism cannot wrap elitism".to_string(),
                    ));
                }
                model.validate(population_size)
            }
        }
    }

    /// Whether the model ranks individuals on every objective.
    pub fn is_multi_objective(&self) -> bool {
        match self {
            Self::Nsga2 { .. } => true,
            Self::Elitism { model, .. } => model.is_multi_objective(),
            _ => false,
        }
    }

    /// Reject fitness functions the model cannot rank.
    pub fn check_objectives(&self, objectives: usize) -> Result<(), ConfigError> {
        if self.is_multi_objective() && objectives < 2 {
            return Err(ConfigError::TooFewObjectives(objectives));
        }
        Ok(())
    }
}

/// Parent selection method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Roulette wheel (fitness-proportionate) selection.
    Proportionate,
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Probability proportional to rank.
    RankBased,
    /// Uniform among the `top` fittest individuals.
    Elitist {
        #[serde(default = "default_elitist_top")]
        top: usize,
    },
    /// Uniform random selection.
    Random,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}
fn default_elitist_top() -> usize {
    5
}

impl SelectionMethod {
    fn validate(&self, population_size: usize) -> Result<(), ConfigError> {
        match self {
            Self::Tournament { size: 0 } => Err(ConfigError::InvalidModel(
                "tournament size must be at least 1".to_string(),
            )),
            Self::Elitist { top } if *top == 0 || *top > population_size => {
                Err(ConfigError::InvalidModel(format!(
                    "elitist selection top {top} outside [1, {population_size}]"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Victim selection for steady-state replacement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum VictimSelection {
    /// Uniform random victim.
    #[default]
    Random,
    /// Least fit individual.
    Worst,
}

/// How parent genomes are combined into offspring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Recombination {
    /// Offspring copy a single parent.
    #[default]
    Asexual,
    /// One cut point, two children.
    SinglePoint,
    /// Two cut points, two children.
    TwoPoint,
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Fitness summary of one population at one update.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PopulationStats {
    /// Update the summary was taken at.
    pub update: u64,
    /// Number of individuals.
    pub size: usize,
    /// Best scalar fitness.
    pub best_fitness: f64,
    /// Mean scalar fitness.
    pub mean_fitness: f64,
    /// Worst scalar fitness.
    pub min_fitness: f64,
    /// Standard deviation of scalar fitness.
    pub fitness_std: f64,
    /// Mean genome length.
    pub mean_genome_len: f64,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EvolutionHistory {
    /// Best fitness per update.
    pub best_fitness: Vec<f64>,
    /// Average fitness per update.
    pub avg_fitness: Vec<f64>,
    /// Standard deviation per update.
    pub fitness_std: Vec<f64>,
    /// Mean genome length per update.
    pub mean_genome_len: Vec<f64>,
}

impl EvolutionHistory {
    /// Append one update's summary.
    pub fn record(&mut self, stats: &PopulationStats) {
        self.best_fitness.push(stats.best_fitness);
        self.avg_fitness.push(stats.mean_fitness);
        self.fitness_std.push(stats.fitness_std);
        self.mean_genome_len.push(stats.mean_genome_len);
    }

    pub fn len(&self) -> usize {
        self.best_fitness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_fitness.is_empty()
    }
}

/// Reason a run stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Ran all configured updates and epochs.
    MaxUpdates,
    /// Reached target fitness.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// User cancelled.
    Cancelled,
}

/// Statistics from a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Updates performed (including any before a checkpoint resume).
    pub updates: u64,
    /// Fitness evaluations performed in this run.
    pub evaluations: u64,
    /// Best fitness achieved.
    pub best_fitness: f64,
    /// Average fitness of the final population(s).
    pub final_avg_fitness: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}
