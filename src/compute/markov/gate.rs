//! Gates: pin lists plus a behaviour table.

use std::collections::VecDeque;

use rand::Rng;

use crate::compute::evolution::EaRng;
use crate::schema::GateKind;

/// A pin reading a state slot from the history buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPin {
    /// State slot index.
    pub slot: usize,
    /// History entry (0 = the state before the current one).
    pub lag: usize,
}

/// Behaviour table of a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateTable {
    /// One output word per address.
    Logic(Vec<u8>),
    /// Per-address weights over output words, row-major.
    Probabilistic {
        /// Output words per row (2^outputs).
        columns: usize,
        /// Raw weights, `rows * columns`.
        weights: Vec<u32>,
        /// Row sums; zero rows draw uniformly.
        totals: Vec<u32>,
    },
}

impl GateTable {
    /// Build a probabilistic table from raw row-major weights.
    pub fn probabilistic(columns: usize, weights: Vec<u32>) -> Self {
        let totals = weights
            .chunks(columns.max(1))
            .map(|row| row.iter().sum())
            .collect();
        Self::Probabilistic {
            columns,
            weights,
            totals,
        }
    }

    /// Number of addressable rows.
    pub fn rows(&self) -> usize {
        match self {
            Self::Logic(entries) => entries.len(),
            Self::Probabilistic { totals, .. } => totals.len(),
        }
    }
}

/// A decoded gate. Pins index the network's flat state vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    pub kind: GateKind,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
    pub history: Vec<HistoryPin>,
    pub table: GateTable,
}

impl Gate {
    /// Table address from input bits then history bits, first pin most significant.
    #[inline]
    pub fn address(&self, state: &[u8], history: &VecDeque<Vec<u8>>) -> usize {
        let mut address = 0usize;
        for &pin in &self.inputs {
            address = (address << 1) | (state[pin] & 1) as usize;
        }
        for pin in &self.history {
            address = (address << 1) | (history[pin.lag][pin.slot] & 1) as usize;
        }
        address
    }

    /// Compute the output word for the current state.
    pub fn fire(&self, state: &[u8], history: &VecDeque<Vec<u8>>, rng: &mut EaRng) -> u8 {
        let address = self.address(state, history);
        match &self.table {
            GateTable::Logic(entries) => entries[address],
            GateTable::Probabilistic {
                columns,
                weights,
                totals,
            } => {
                let total = totals[address];
                if total == 0 {
                    return rng.gen_range(0..*columns) as u8;
                }
                let row = &weights[address * columns..(address + 1) * columns];
                let mut target = rng.gen_range(0..total);
                for (column, &w) in row.iter().enumerate() {
                    if target < w {
                        return column as u8;
                    }
                    target -= w;
                }
                (*columns - 1) as u8
            }
        }
    }

    /// OR the bits of an output word into the staging vector.
    #[inline]
    pub fn write(&self, word: u8, staging: &mut [u8]) {
        let n = self.outputs.len();
        for (j, &pin) in self.outputs.iter().enumerate() {
            staging[pin] |= (word >> (n - 1 - j)) & 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn xor_gate() -> Gate {
        Gate {
            kind: GateKind::Logic,
            inputs: vec![0, 1],
            outputs: vec![2],
            history: Vec::new(),
            table: GateTable::Logic(vec![0, 1, 1, 0]),
        }
    }

    #[test]
    fn test_logic_address_and_fire() {
        let gate = xor_gate();
        let history = VecDeque::new();
        let mut rng = EaRng::seed_from_u64(0);

        assert_eq!(gate.address(&[1, 0, 0], &history), 2);
        assert_eq!(gate.fire(&[1, 0, 0], &history, &mut rng), 1);
        assert_eq!(gate.fire(&[1, 1, 0], &history, &mut rng), 0);
    }

    #[test]
    fn test_history_bits_follow_inputs() {
        let gate = Gate {
            history: vec![HistoryPin { slot: 2, lag: 1 }],
            table: GateTable::Logic(vec![0; 8]),
            ..xor_gate()
        };
        let history: VecDeque<Vec<u8>> = vec![vec![0, 0, 0], vec![0, 0, 1]].into();
        assert_eq!(gate.address(&[1, 1, 0], &history), 0b111);
    }

    #[test]
    fn test_write_ors_bits() {
        let gate = Gate {
            outputs: vec![0, 2],
            ..xor_gate()
        };
        let mut staging = vec![0, 0, 1];
        gate.write(0b10, &mut staging);
        assert_eq!(staging, vec![1, 0, 1]);
    }

    #[test]
    fn test_probabilistic_certain_row() {
        let gate = Gate {
            kind: GateKind::Probabilistic,
            inputs: vec![0],
            outputs: vec![1],
            history: Vec::new(),
            table: GateTable::probabilistic(2, vec![0, 5, 7, 0]),
        };
        let history = VecDeque::new();
        let mut rng = EaRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(gate.fire(&[0, 0], &history, &mut rng), 1);
            assert_eq!(gate.fire(&[1, 0], &history, &mut rng), 0);
        }
    }

    #[test]
    fn test_zero_row_is_uniform() {
        let table = GateTable::probabilistic(4, vec![0; 4]);
        let gate = Gate {
            kind: GateKind::Probabilistic,
            inputs: Vec::new(),
            outputs: vec![0, 1],
            history: Vec::new(),
            table,
        };
        let history = VecDeque::new();
        let mut rng = EaRng::seed_from_u64(11);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[gate.fire(&[0, 0], &history, &mut rng) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
