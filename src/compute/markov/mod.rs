//! Markov networks: genome decoding and the synchronous gate runtime.
//!
//! - **Gates** (`gate`): pin lists and logic/probabilistic tables
//! - **Decoder** (`decode`): start-codon scan that turns a genome into gates
//! - **Runtime** (`network`): state, staging and history buffers driven per timestep

mod decode;
mod gate;
mod network;

pub use decode::{decode_gates, max_gate_span};
pub use gate::{Gate, GateTable, HistoryPin};
pub use network::{MarkovNetwork, Updates, constant_input};
