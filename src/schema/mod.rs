//! Schema module - Configuration and progress types for evolutionary runs.

mod config;
mod evolution;
mod markov;
mod meta;

pub use config::*;
pub use evolution::*;
pub use markov::*;
pub use meta::*;
