//! Markov network runtime.
//!
//! A network owns its decoded gates, a flat state vector laid out as
//! `[inputs | outputs | hidden]`, a staging vector of the same size and a
//! fixed-depth history of prior states. Every update is synchronous: gates
//! read only the state from before the update and write into staging, which
//! is then swapped in.

use std::collections::VecDeque;

use rand::SeedableRng;

use crate::compute::evolution::{EaRng, Genome};
use crate::schema::{GenomeTopology, MarkovConfig};

use super::{Gate, decode_gates};

/// Executable network decoded from a genome.
#[derive(Debug, Clone)]
pub struct MarkovNetwork {
    inputs: usize,
    outputs: usize,
    gates: Vec<Gate>,
    /// Current state vector.
    state: Vec<u8>,
    /// Buffer for the next state.
    staging: Vec<u8>,
    /// Prior states, most recent first. Always exactly `history_depth` long.
    history: VecDeque<Vec<u8>>,
    /// Output slots (relative to the output block) written by no gate.
    unwired: Vec<usize>,
    fallback: u8,
    rng: EaRng,
}

impl MarkovNetwork {
    /// Decode a genome and build its runtime. The seed drives probabilistic gates only.
    pub fn from_genome(
        genome: &Genome,
        config: &MarkovConfig,
        topology: GenomeTopology,
        seed: u64,
    ) -> Self {
        Self::from_gates(decode_gates(genome, config, topology), config, seed)
    }

    /// Build a runtime around already decoded gates.
    pub fn from_gates(gates: Vec<Gate>, config: &MarkovConfig, seed: u64) -> Self {
        let size = config.state_size();
        let output_range = config.inputs..config.inputs + config.outputs;

        let mut wired = vec![false; config.outputs];
        for gate in &gates {
            for &pin in &gate.outputs {
                if output_range.contains(&pin) {
                    wired[pin - config.inputs] = true;
                }
            }
        }
        let unwired = wired
            .iter()
            .enumerate()
            .filter(|(_, w)| !**w)
            .map(|(i, _)| i)
            .collect();

        Self {
            inputs: config.inputs,
            outputs: config.outputs,
            gates,
            state: vec![0; size],
            staging: vec![0; size],
            history: (0..config.history_depth).map(|_| vec![0; size]).collect(),
            unwired,
            fallback: config.fallback_output,
            rng: EaRng::seed_from_u64(seed),
        }
    }

    /// Decoded gates in arena order.
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Full current state vector.
    pub fn state(&self) -> &[u8] {
        &self.state
    }

    /// Current output slots.
    pub fn outputs(&self) -> &[u8] {
        &self.state[self.inputs..self.inputs + self.outputs]
    }

    /// Depth of the history buffer.
    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    /// Reset state and history to zero. The random stream is left running.
    pub fn clear(&mut self) {
        self.state.fill(0);
        self.staging.fill(0);
        for entry in &mut self.history {
            entry.fill(0);
        }
    }

    /// Advance one timestep.
    ///
    /// `source(step, inputs)` fills the input slots before the gates fire.
    pub fn step<F>(&mut self, step: usize, source: &mut F)
    where
        F: FnMut(usize, &mut [u8]),
    {
        source(step, &mut self.state[..self.inputs]);

        self.staging.fill(0);
        for gate in &self.gates {
            let word = gate.fire(&self.state, &self.history, &mut self.rng);
            gate.write(word, &mut self.staging);
        }
        for &slot in &self.unwired {
            self.staging[self.inputs + slot] = self.fallback;
        }

        std::mem::swap(&mut self.state, &mut self.staging);

        // Staging now holds the prior state; rotate it into the history and
        // reuse the dropped entry as the next staging buffer.
        if let Some(mut oldest) = self.history.pop_back() {
            std::mem::swap(&mut oldest, &mut self.staging);
            self.history.push_front(oldest);
        }
    }

    /// Lazily run `steps` timesteps, yielding the outputs after each one.
    pub fn update<F>(&mut self, steps: usize, source: F) -> Updates<'_, F>
    where
        F: FnMut(usize, &mut [u8]),
    {
        Updates {
            network: self,
            source,
            step: 0,
            steps,
        }
    }

    /// Run `steps` timesteps and return the final outputs.
    pub fn update_n<F>(&mut self, steps: usize, mut source: F) -> &[u8]
    where
        F: FnMut(usize, &mut [u8]),
    {
        for step in 0..steps {
            self.step(step, &mut source);
        }
        self.outputs()
    }
}

/// Input source that presents the same values at every step.
///
/// Extra values are ignored; missing values leave the slot untouched.
pub fn constant_input(values: &[u8]) -> impl FnMut(usize, &mut [u8]) + '_ {
    move |_, inputs| {
        let n = inputs.len().min(values.len());
        inputs[..n].copy_from_slice(&values[..n]);
    }
}

/// Iterator returned by [`MarkovNetwork::update`].
pub struct Updates<'a, F> {
    network: &'a mut MarkovNetwork,
    source: F,
    step: usize,
    steps: usize,
}

impl<F> Iterator for Updates<'_, F>
where
    F: FnMut(usize, &mut [u8]),
{
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.step >= self.steps {
            return None;
        }
        self.network.step(self.step, &mut self.source);
        self.step += 1;
        Some(self.network.outputs().to_vec())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.steps - self.step;
        (left, Some(left))
    }
}

impl<F> ExactSizeIterator for Updates<'_, F> where F: FnMut(usize, &mut [u8]) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::markov::{GateTable, HistoryPin};
    use crate::schema::GateKind;
    use proptest::prelude::*;

    fn small_config() -> MarkovConfig {
        MarkovConfig {
            inputs: 2,
            outputs: 2,
            hidden: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_gates_yield_fallback() {
        for fallback in [0u8, 1] {
            let config = MarkovConfig {
                fallback_output: fallback,
                ..small_config()
            };
            let mut network = MarkovNetwork::from_gates(Vec::new(), &config, 0);
            let outputs: Vec<_> = network.update(10, constant_input(&[1, 1])).collect();

            assert_eq!(outputs.len(), 10);
            assert!(outputs.iter().all(|o| o == &vec![fallback, fallback]));
        }
    }

    #[test]
    fn test_xor_gate_into_output() {
        let config = small_config();
        let gate = Gate {
            kind: GateKind::Logic,
            inputs: vec![0, 1],
            outputs: vec![2],
            history: Vec::new(),
            table: GateTable::Logic(vec![0, 1, 1, 0]),
        };
        let mut network = MarkovNetwork::from_gates(vec![gate], &config, 0);

        for (a, b) in [(0u8, 0u8), (0, 1), (1, 0), (1, 1)] {
            network.clear();
            let out = network.update_n(1, constant_input(&[a, b]));
            assert_eq!(out[0], a ^ b);
            // Second output slot is unwired.
            assert_eq!(out[1], config.fallback_output);
        }
    }

    #[test]
    fn test_synchronous_update() {
        // Copy slot 4 -> 5 and 5 -> 4: a synchronous update swaps them.
        let config = small_config();
        let copy = |from: usize, to: usize| Gate {
            kind: GateKind::Logic,
            inputs: vec![from],
            outputs: vec![to],
            history: Vec::new(),
            table: GateTable::Logic(vec![0, 1]),
        };
        // Seed slot 4 through an input-driven gate on the first step.
        let seed = Gate {
            kind: GateKind::Logic,
            inputs: vec![0],
            outputs: vec![4],
            history: Vec::new(),
            table: GateTable::Logic(vec![0, 1]),
        };
        let mut network =
            MarkovNetwork::from_gates(vec![seed, copy(4, 5), copy(5, 4)], &config, 0);

        let mut source = |step: usize, inputs: &mut [u8]| inputs[0] = (step == 0) as u8;
        network.step(0, &mut source);
        assert_eq!(&network.state()[4..], &[1, 0]);
        network.step(1, &mut source);
        assert_eq!(&network.state()[4..], &[0, 1]);
        network.step(2, &mut source);
        assert_eq!(&network.state()[4..], &[1, 0]);
    }

    #[test]
    fn test_history_delays_input() {
        let config = MarkovConfig {
            history_depth: 2,
            ..small_config()
        };
        // Output 0 follows input 0 as it was two updates before the current state.
        let gate = Gate {
            kind: GateKind::Logic,
            inputs: Vec::new(),
            outputs: vec![2],
            history: vec![HistoryPin { slot: 0, lag: 1 }],
            table: GateTable::Logic(vec![0, 1]),
        };
        let mut network = MarkovNetwork::from_gates(vec![gate], &config, 0);
        assert_eq!(network.history_depth(), 2);

        let pulses = [1u8, 0, 0, 0, 0];
        let outputs: Vec<u8> = network
            .update(pulses.len(), |step, inputs: &mut [u8]| inputs[0] = pulses[step])
            .map(|o| o[0])
            .collect();
        // The pulse enters state at step 0 and reaches history lag 1 at step 2.
        assert_eq!(outputs, vec![0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_clear_resets_state() {
        let config = MarkovConfig {
            history_depth: 1,
            fallback_output: 1,
            ..small_config()
        };
        let mut network = MarkovNetwork::from_gates(Vec::new(), &config, 0);
        network.update_n(3, constant_input(&[1, 1]));
        assert!(network.state().iter().any(|&s| s != 0));

        network.clear();
        assert!(network.state().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_update_is_lazy() {
        let config = small_config();
        let mut network = MarkovNetwork::from_gates(Vec::new(), &config, 0);
        let mut calls = 0;
        {
            let mut updates = network.update(5, |_, _: &mut [u8]| calls += 1);
            assert_eq!(updates.len(), 5);
            updates.next();
            updates.next();
        }
        assert_eq!(calls, 2);
    }

    proptest! {
        #[test]
        fn prop_update_is_deterministic(
            codons in proptest::collection::vec(0u32..256, 50..400),
            inputs in proptest::collection::vec(0u8..2, 20),
            seed in any::<u64>(),
        ) {
            let config = MarkovConfig {
                history_depth: 2,
                gate: crate::schema::GateLimits { history_limit: 2, ..Default::default() },
                ..Default::default()
            };
            let mut codons = codons;
            codons[0] = 42;
            codons[1] = 213;
            let genome = Genome::new(codons);

            let run = || {
                let mut network =
                    MarkovNetwork::from_genome(&genome, &config, GenomeTopology::Circular, seed);
                network
                    .update(inputs.len(), |step, slots: &mut [u8]| {
                        slots.fill(inputs[step]);
                    })
                    .collect::<Vec<_>>()
            };
            prop_assert_eq!(run(), run());
        }
    }
}
