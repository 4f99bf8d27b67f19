//! Genome-to-gate decoding.
//!
//! A gate starts wherever the two configured start codons appear in a row.
//! The codons after the start pair are read as a fixed-width descriptor:
//!
//! ```text
//! kind | n_in | n_out | n_hist | input_limit pins | output_limit pins
//!      | history_limit (slot, lag) pairs | table
//! ```
//!
//! Counts map into `[floor, limit]`, pins map into the state range by modulo,
//! so every decoded gate is valid by construction.

use crate::compute::evolution::Genome;
use crate::schema::{GateKind, GateKindWeight, GenomeTopology, MarkovConfig};

use super::{Gate, GateTable, HistoryPin};

/// Sequential codon reader starting at an offset.
struct CodonReader<'a> {
    codons: &'a [u32],
    pos: usize,
    circular: bool,
}

impl<'a> CodonReader<'a> {
    fn new(codons: &'a [u32], pos: usize, circular: bool) -> Self {
        Self {
            codons,
            pos,
            circular,
        }
    }

    /// Next codon, or `None` once a linear genome is exhausted.
    fn next_codon(&mut self) -> Option<u32> {
        let len = self.codons.len();
        let value = if self.pos < len {
            self.codons[self.pos]
        } else if self.circular && len > 0 {
            self.codons[self.pos % len]
        } else {
            return None;
        };
        self.pos += 1;
        Some(value)
    }
}

/// Map a codon into `[floor, limit]`.
#[inline]
fn pin_count(codon: u32, floor: usize, limit: usize) -> usize {
    floor + codon as usize % (limit.saturating_sub(floor) + 1)
}

/// Pick a gate kind from the cumulative weight distribution.
fn select_kind(codon: u32, kinds: &[GateKindWeight], total: u64) -> Option<GateKind> {
    if total == 0 {
        return None;
    }
    let mut target = codon as u64 % total;
    for k in kinds {
        let w = k.weight as u64;
        if target < w {
            return Some(k.kind);
        }
        target -= w;
    }
    None
}

/// Longest descriptor (in codons, including the start pair) a gate can occupy.
pub fn max_gate_span(config: &MarkovConfig) -> usize {
    let g = &config.gate;
    let rows = 1usize << (g.input_limit + g.history_limit);
    let columns = 1usize << g.output_limit;
    let table = config
        .gate_kinds
        .iter()
        .filter(|k| k.weight > 0)
        .map(|k| match k.kind {
            GateKind::Logic => rows,
            GateKind::Probabilistic => rows * columns,
        })
        .max()
        .unwrap_or(0);
    2 + 4 + g.input_limit + g.output_limit + 2 * g.history_limit + table
}

/// Decode every gate encoded in a genome.
///
/// Never fails: non-coding regions are skipped, a truncated descriptor at the
/// end of a linear genome is ignored.
pub fn decode_gates(genome: &Genome, config: &MarkovConfig, topology: GenomeTopology) -> Vec<Gate> {
    let codons = genome.codons();
    let len = codons.len();
    let state_size = config.state_size();
    let circular = topology == GenomeTopology::Circular;
    let total_weight = config.total_kind_weight();
    let [first, second] = config.start_codon;

    let mut gates = Vec::new();
    if len < 2 || state_size == 0 || total_weight == 0 {
        return gates;
    }

    for i in 0..len {
        let next = if i + 1 < len {
            codons[i + 1]
        } else if circular {
            codons[0]
        } else {
            break;
        };

        if codons[i] == first && next == second {
            let mut reader = CodonReader::new(codons, i + 2, circular);
            if let Some(gate) = read_gate(&mut reader, config, state_size, total_weight) {
                gates.push(gate);
            }
        }
    }

    gates
}

fn read_gate(
    reader: &mut CodonReader<'_>,
    config: &MarkovConfig,
    state_size: usize,
    total_weight: u64,
) -> Option<Gate> {
    let g = &config.gate;

    let kind = select_kind(reader.next_codon()?, &config.gate_kinds, total_weight)?;
    let n_in = pin_count(reader.next_codon()?, g.input_floor, g.input_limit);
    let n_out = pin_count(reader.next_codon()?, g.output_floor, g.output_limit);
    let mut n_hist = pin_count(reader.next_codon()?, g.history_floor, g.history_limit);
    if config.history_depth == 0 {
        n_hist = 0;
    }

    let mut inputs = Vec::with_capacity(n_in);
    for i in 0..g.input_limit {
        let codon = reader.next_codon()?;
        if i < n_in {
            inputs.push(codon as usize % state_size);
        }
    }

    let mut outputs = Vec::with_capacity(n_out);
    for i in 0..g.output_limit {
        let codon = reader.next_codon()?;
        if i < n_out {
            outputs.push(codon as usize % state_size);
        }
    }

    let depth = config.history_depth.max(1);
    let mut history = Vec::with_capacity(n_hist);
    for i in 0..g.history_limit {
        let slot = reader.next_codon()?;
        let lag = reader.next_codon()?;
        if i < n_hist {
            history.push(HistoryPin {
                slot: slot as usize % state_size,
                lag: lag as usize % depth,
            });
        }
    }

    let rows = 1usize << (n_in + n_hist);
    let columns = 1usize << n_out;
    let table = match kind {
        GateKind::Logic => {
            let mut entries = Vec::with_capacity(rows);
            for _ in 0..rows {
                entries.push((reader.next_codon()? as usize % columns) as u8);
            }
            GateTable::Logic(entries)
        }
        GateKind::Probabilistic => {
            let steps = config.weight_steps.max(1);
            let mut weights = Vec::with_capacity(rows * columns);
            for _ in 0..rows * columns {
                weights.push(reader.next_codon()? % steps);
            }
            GateTable::probabilistic(columns, weights)
        }
    };

    Some(Gate {
        kind,
        inputs,
        outputs,
        history,
        table,
    })
}
