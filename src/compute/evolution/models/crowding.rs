//! Deterministic crowding.
//!
//! Parents are paired at random; each child competes only with the more
//! similar of its two parents and replaces it iff strictly fitter.

use rand::seq::SliceRandom;

use crate::compute::evolution::genome::genome_distance;
use crate::compute::evolution::population::by_fitness;
use crate::compute::evolution::{EaRng, Individual, Population};

use super::StepContext;

pub(super) fn advance(population: &mut Population, ctx: &mut StepContext<'_>, rng: &mut EaRng) {
    let mut order: Vec<usize> = (0..population.len()).collect();
    order.shuffle(rng);
    let pairs: Vec<(usize, usize)> = order.chunks_exact(2).map(|c| (c[0], c[1])).collect();

    let mut children: Vec<Individual> = Vec::with_capacity(pairs.len() * 2);
    for &(a, b) in &pairs {
        let (x, y) = ctx.breed_pair(&population[a], &population[b], rng);
        children.push(x);
        children.push(y);
    }
    ctx.evaluate(&mut children, rng);

    let mut children = children.into_iter();
    for (a, b) in pairs {
        let (Some(x), Some(y)) = (children.next(), children.next()) else {
            break;
        };

        let straight = genome_distance(&population[a].genome, &x.genome)
            + genome_distance(&population[b].genome, &y.genome);
        let crossed = genome_distance(&population[a].genome, &y.genome)
            + genome_distance(&population[b].genome, &x.genome);
        let matches = if straight <= crossed {
            [(a, x), (b, y)]
        } else {
            [(a, y), (b, x)]
        };

        for (parent, child) in matches {
            if by_fitness(&child, &population[parent]).is_gt() {
                population[parent] = child;
            }
        }
    }
}
