//! Fitness values and pluggable fitness functions.
//!
//! The core only requires [`FitnessFunction`]. The all-ones family and the
//! XOR task are reference implementations used by the binary and demos.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::compute::markov::MarkovNetwork;
use crate::schema::{GenomeTopology, MarkovConfig};

use super::{EaRng, Genome};

/// Scalar or multi-objective fitness. Larger is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fitness {
    Unary(f64),
    Multi(Vec<f64>),
}

impl Fitness {
    /// Scalar view: the value itself or the sum of objectives.
    pub fn scalar(&self) -> f64 {
        match self {
            Self::Unary(v) => *v,
            Self::Multi(values) => values.iter().sum(),
        }
    }

    /// Objective vector view.
    pub fn objectives(&self) -> &[f64] {
        match self {
            Self::Unary(v) => std::slice::from_ref(v),
            Self::Multi(values) => values,
        }
    }

    /// Pareto dominance: no worse everywhere and strictly better somewhere.
    pub fn dominates(&self, other: &Fitness) -> bool {
        let a = self.objectives();
        let b = other.objectives();
        let mut strictly_better = false;
        for (x, y) in a.iter().zip(b) {
            if x < y {
                return false;
            }
            if x > y {
                strictly_better = true;
            }
        }
        strictly_better
    }
}

/// Evaluates genomes. Implementations must be infallible and thread-safe.
pub trait FitnessFunction: Send + Sync {
    /// Score one genome, drawing any randomness from `rng`.
    fn evaluate(&self, genome: &Genome, rng: &mut EaRng) -> Fitness;

    /// Number of objectives in the returned fitness.
    fn objectives(&self) -> usize {
        1
    }
}

/// Counts codons equal to one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllOnes;

impl FitnessFunction for AllOnes {
    fn evaluate(&self, genome: &Genome, _rng: &mut EaRng) -> Fitness {
        Fitness::Unary(count_ones(genome.codons()) as f64)
    }
}

/// Counts ones separately in equal slices of the genome.
#[derive(Debug, Clone, Copy)]
pub struct MultiAllOnes {
    pub objectives: usize,
}

impl Default for MultiAllOnes {
    fn default() -> Self {
        Self { objectives: 2 }
    }
}

impl FitnessFunction for MultiAllOnes {
    fn evaluate(&self, genome: &Genome, _rng: &mut EaRng) -> Fitness {
        let n = self.objectives.max(1);
        let codons = genome.codons();
        let chunk = codons.len().div_ceil(n).max(1);
        let mut values: Vec<f64> = codons
            .chunks(chunk)
            .map(|c| count_ones(c) as f64)
            .collect();
        values.resize(n, 0.0);
        Fitness::Multi(values)
    }

    fn objectives(&self) -> usize {
        self.objectives.max(1)
    }
}

fn count_ones(codons: &[u32]) -> usize {
    codons.iter().filter(|&&c| c == 1).count()
}

/// A behavioural task run against a Markov network over many trials.
pub trait Task: Send + Sync {
    /// Fill the input slots for a new trial.
    fn draw_inputs(&self, rng: &mut EaRng, inputs: &mut [u8]);

    /// Score the outputs after the network ran on `inputs`.
    fn score(&self, inputs: &[u8], outputs: &[u8]) -> f64;
}

/// Output 0 must equal the XOR of inputs 0 and 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct XorTask;

impl Task for XorTask {
    fn draw_inputs(&self, rng: &mut EaRng, inputs: &mut [u8]) {
        for slot in inputs.iter_mut() {
            *slot = rng.gen_range(0..=1);
        }
    }

    fn score(&self, inputs: &[u8], outputs: &[u8]) -> f64 {
        match (inputs, outputs) {
            ([a, b, ..], [out, ..]) if *out == (a ^ b) => 1.0,
            _ => 0.0,
        }
    }
}

/// How per-trial scores are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Reduction {
    #[default]
    Sum,
    Mean,
}

/// Decodes a network once, then runs `trials` randomized trials of a task.
#[derive(Debug, Clone)]
pub struct TrialEvaluator<T> {
    pub task: T,
    pub markov: MarkovConfig,
    pub topology: GenomeTopology,
    pub trials: usize,
    pub reduction: Reduction,
}

impl<T: Task> TrialEvaluator<T> {
    pub fn new(task: T, markov: MarkovConfig, topology: GenomeTopology, trials: usize) -> Self {
        Self {
            task,
            markov,
            topology,
            trials,
            reduction: Reduction::Sum,
        }
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }
}

impl<T: Task> FitnessFunction for TrialEvaluator<T> {
    fn evaluate(&self, genome: &Genome, rng: &mut EaRng) -> Fitness {
        let mut network =
            MarkovNetwork::from_genome(genome, &self.markov, self.topology, rng.next_u64());
        let mut inputs = vec![0u8; self.markov.inputs];

        let mut total = 0.0;
        for _ in 0..self.trials {
            self.task.draw_inputs(rng, &mut inputs);
            network.clear();
            let outputs = network.update_n(self.markov.update_n, |_, slots: &mut [u8]| {
                slots.copy_from_slice(&inputs)
            });
            total += self.task.score(&inputs, outputs);
        }

        let value = match self.reduction {
            Reduction::Sum => total,
            Reduction::Mean if self.trials > 0 => total / self.trials as f64,
            Reduction::Mean => 0.0,
        };
        Fitness::Unary(value)
    }
}
