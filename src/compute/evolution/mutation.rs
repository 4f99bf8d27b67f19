//! Per-site and structural mutation operators.
//!
//! Every structural operator checks the length bounds first and does nothing
//! when the edit would leave `[min_size, max_size]`.

use rand::Rng;
use rand::seq::index;
use rand_distr::{Binomial, Distribution};

use crate::schema::{MutationConfig, RepresentationConfig, SiteMutation};

use super::{EaRng, Genome};

/// Apply per-site mutation followed by each structural operator.
pub fn mutate(
    genome: &mut Genome,
    mutation: &MutationConfig,
    bounds: &RepresentationConfig,
    rng: &mut EaRng,
) {
    mutate_sites(genome, mutation, rng);

    if rng.gen_bool(mutation.deletion_p) {
        delete(genome, mutation, bounds, rng);
    }
    if rng.gen_bool(mutation.duplication_p) {
        duplicate(genome, mutation, bounds, rng);
    }
    if rng.gen_bool(mutation.insertion_p) {
        insert(genome, mutation, bounds, rng);
    }
}

/// Replace each codon independently with probability `per_site_p`.
///
/// Returns the number of sites touched.
pub fn mutate_sites(genome: &mut Genome, mutation: &MutationConfig, rng: &mut EaRng) -> usize {
    let len = genome.len();
    if len == 0 || mutation.per_site_p <= 0.0 {
        return 0;
    }

    let count = match Binomial::new(len as u64, mutation.per_site_p) {
        Ok(binomial) => binomial.sample(rng) as usize,
        Err(_) => return 0,
    };

    let codons = genome.codons_mut();
    for i in index::sample(rng, len, count).into_iter() {
        codons[i] = site_value(codons[i], mutation, rng);
    }
    count
}

#[inline]
fn site_value(current: u32, mutation: &MutationConfig, rng: &mut EaRng) -> u32 {
    match mutation.site {
        SiteMutation::UniformInt => {
            let (lo, hi) = mutation.codon_range;
            rng.gen_range(lo..=hi)
        }
        SiteMutation::BitFlip => current ^ 1,
    }
}

#[inline]
fn edit_size(mutation: &MutationConfig, rng: &mut EaRng) -> usize {
    rng.gen_range(mutation.indel_min_size..=mutation.indel_max_size)
}

/// Remove a contiguous range. Returns whether the genome changed.
pub fn delete(
    genome: &mut Genome,
    mutation: &MutationConfig,
    bounds: &RepresentationConfig,
    rng: &mut EaRng,
) -> bool {
    let size = edit_size(mutation, rng);
    let len = genome.len();
    if size > len || len - size < bounds.min_size {
        return false;
    }

    let start = rng.gen_range(0..=len - size);
    genome.codons_mut().drain(start..start + size);
    true
}

/// Copy a contiguous range and reinsert it at a random position.
pub fn duplicate(
    genome: &mut Genome,
    mutation: &MutationConfig,
    bounds: &RepresentationConfig,
    rng: &mut EaRng,
) -> bool {
    let size = edit_size(mutation, rng);
    let len = genome.len();
    if size > len || len + size > bounds.max_size {
        return false;
    }

    let start = rng.gen_range(0..=len - size);
    let segment: Vec<u32> = genome.codons()[start..start + size].to_vec();
    let at = rng.gen_range(0..=len);
    genome.codons_mut().splice(at..at, segment);
    true
}

/// Insert a freshly drawn range at a random position.
pub fn insert(
    genome: &mut Genome,
    mutation: &MutationConfig,
    bounds: &RepresentationConfig,
    rng: &mut EaRng,
) -> bool {
    let size = edit_size(mutation, rng);
    let len = genome.len();
    if len + size > bounds.max_size {
        return false;
    }

    let (lo, hi) = mutation.codon_range;
    let segment: Vec<u32> = (0..size).map(|_| rng.gen_range(lo..=hi)).collect();
    let at = rng.gen_range(0..=len);
    genome.codons_mut().splice(at..at, segment);
    true
}
