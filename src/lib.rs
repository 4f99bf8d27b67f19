//! Markov EA - Evolving probabilistic logic networks with island models.
//!
//! Genomes are sequences of integer codons. A decoder reads them into Markov
//! networks: small state machines of deterministic and probabilistic logic
//! gates that are updated synchronously. An evolutionary algorithm breeds
//! genomes against a fitness function, and a meta-population runs many such
//! algorithms as islands that exchange individuals.
//!
//! # Architecture
//!
//! - `schema`: JSON configuration, validation and run statistics
//! - `compute::markov`: genome decoding and the network runtime
//! - `compute::evolution`: variation, selection, generational models, the run loop
//! - `compute::meta`: island stepping, migration and QHFC tiers
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use markov_ea::{
//!     compute::evolution::AllOnes,
//!     schema::MetaPopulationConfig,
//!     MetaPopulation,
//! };
//!
//! let config = MetaPopulationConfig::default();
//! let mut meta = MetaPopulation::new(config, Arc::new(AllOnes)).unwrap();
//! let summary = meta.run().unwrap();
//! println!("best fitness after {} updates: {}", summary.updates, summary.best_fitness);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{EvolutionaryAlgorithm, MarkovNetwork, MetaPopulation};
pub use schema::{EaConfig, MetaPopulationConfig, RunSummary};
