//! Compute module - Markov networks, evolution and island models.

pub mod evolution;
pub mod markov;
pub mod meta;

pub use evolution::{EaRng, EvolutionaryAlgorithm, FitnessFunction, Genome, Individual};
pub use markov::MarkovNetwork;
pub use meta::MetaPopulation;
