//! Genome type plus ancestor generation and recombination.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::compute::markov::max_gate_span;
use crate::schema::{Ancestor, EaConfig, GenomeTopology, Recombination};

use super::EaRng;

/// Ordered sequence of integer codons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome(Vec<u32>);

impl Genome {
    pub fn new(codons: Vec<u32>) -> Self {
        Self(codons)
    }

    #[inline]
    pub fn codons(&self) -> &[u32] {
        &self.0
    }

    #[inline]
    pub fn codons_mut(&mut self) -> &mut Vec<u32> {
        &mut self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u32>> for Genome {
    fn from(codons: Vec<u32>) -> Self {
        Self(codons)
    }
}

/// Generate one ancestral genome according to the configured ancestor.
pub fn random_genome(config: &EaConfig, rng: &mut EaRng) -> Genome {
    let len = config.representation.initial_size;
    let (lo, hi) = config.mutation.codon_range;

    match config.representation.ancestor {
        Ancestor::RandomCodons => Genome((0..len).map(|_| rng.gen_range(lo..=hi)).collect()),
        Ancestor::RandomBitstring => Genome((0..len).map(|_| rng.gen_range(0..=1)).collect()),
        Ancestor::MarkovNetwork => {
            let mut codons: Vec<u32> = (0..len).map(|_| rng.gen_range(lo..=hi)).collect();
            plant_start_codons(&mut codons, config, rng);
            Genome(codons)
        }
    }
}

/// Write `initial_gates` start codon pairs at random positions.
///
/// On linear genomes the pair is kept far enough from the end for a full gate
/// descriptor to follow when the genome is long enough.
fn plant_start_codons(codons: &mut [u32], config: &EaConfig, rng: &mut EaRng) {
    let len = codons.len();
    if len < 2 {
        return;
    }

    let span = max_gate_span(&config.markov);
    let last = match config.representation.topology {
        GenomeTopology::Linear if len > span => len - span,
        _ => len - 2,
    };

    let [first, second] = config.markov.start_codon;
    for _ in 0..config.markov.initial_gates {
        let i = rng.gen_range(0..=last);
        codons[i] = first;
        codons[i + 1] = second;
    }
}

/// Combine two parents into two offspring.
///
/// Cut points lie within the shorter parent, so each child inherits one
/// parent's length and both stay within the length bounds.
pub fn recombine(
    a: &Genome,
    b: &Genome,
    method: Recombination,
    rng: &mut EaRng,
) -> (Genome, Genome) {
    let shared = a.len().min(b.len());
    match method {
        Recombination::Asexual => (a.clone(), b.clone()),
        _ if shared < 2 => (a.clone(), b.clone()),
        Recombination::SinglePoint => {
            let cut = rng.gen_range(1..shared);
            (splice(a, b, cut, shared), splice(b, a, cut, shared))
        }
        Recombination::TwoPoint => {
            let mut x = rng.gen_range(0..shared);
            let mut y = rng.gen_range(0..shared);
            if x > y {
                std::mem::swap(&mut x, &mut y);
            }
            (splice(a, b, x, y), splice(b, a, x, y))
        }
    }
}

/// Copy of `base` with `[from, to)` taken from `donor`.
fn splice(base: &Genome, donor: &Genome, from: usize, to: usize) -> Genome {
    let mut codons = base.0.clone();
    codons[from..to].copy_from_slice(&donor.0[from..to]);
    Genome(codons)
}

/// Hamming distance over the shared prefix plus the length difference.
pub fn genome_distance(a: &Genome, b: &Genome) -> usize {
    let mismatches = a.0.iter().zip(&b.0).filter(|(x, y)| x != y).count();
    mismatches + a.len().abs_diff(b.len())
}
