//! Evolutionary algorithm over integer genomes.
//!
//! # Overview
//!
//! - **Genomes** (`genome`): codon sequences, ancestors and recombination
//! - **Mutation** (`mutation`): per-site substitution and bounded indels
//! - **Fitness** (`fitness`): the pluggable [`FitnessFunction`] plus reference tasks
//! - **Selection** (`selection`): parent and victim policies
//! - **Models** (`models`): death-birth, generational, crowding, NSGA-II and elitism
//! - **Engine** (`engine`): one island's run loop with checkpoints
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use markov_ea::compute::evolution::{EvolutionaryAlgorithm, TrialEvaluator, XorTask};
//! use markov_ea::schema::EaConfig;
//!
//! let config = EaConfig::default();
//! let fitness = TrialEvaluator::new(
//!     XorTask,
//!     config.markov.clone(),
//!     config.representation.topology,
//!     128,
//! );
//! let mut ea = EvolutionaryAlgorithm::new(config, Arc::new(fitness)).unwrap();
//! let summary = ea
//!     .run_with_callback(|event| {
//!         println!("update {}: best = {:.1}", event.update, event.stats.best_fitness);
//!     })
//!     .unwrap();
//! println!("stopped after {} updates", summary.updates);
//! ```

mod checkpoint;
mod engine;
mod fitness;
mod genome;
pub mod models;
mod mutation;
mod population;
mod selection;

/// Random stream used everywhere in the crate. Seedable and serializable.
pub type EaRng = rand_chacha::ChaCha8Rng;

pub use checkpoint::{
    CheckpointError, EaCheckpoint, checkpoint_path, latest_checkpoint, load_json, save_json,
};
pub use engine::{EngineError, EvolutionaryAlgorithm, UpdateEvent};
pub use fitness::{
    AllOnes, Fitness, FitnessFunction, MultiAllOnes, Reduction, Task, TrialEvaluator, XorTask,
};
pub use genome::{Genome, genome_distance, random_genome, recombine};
pub use models::{StepContext, advance, evaluate_individuals};
pub use mutation::{delete, duplicate, insert, mutate, mutate_sites};
pub use population::{
    Attributes, Individual, Population, by_fitness, population_stats, ranked_indices, worst_index,
};
pub use selection::{select_index, select_victims, tournament};
