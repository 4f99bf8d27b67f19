//! Generational models: one call advances a population by one update.
//!
//! Every model preserves the population size. Offspring are bred and
//! evaluated through a [`StepContext`], which owns id assignment and keeps the
//! evaluation count.

mod crowding;
mod death_birth;
mod elitism;
mod generational;
mod nsga2;

pub use nsga2::{assign_rank_and_crowding, crowding_distance, non_dominated_fronts};

use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::schema::{EaConfig, GenerationalModel, Recombination, SelectionMethod};

use super::genome::recombine;
use super::mutation::mutate;
use super::selection::select_index;
use super::{EaRng, FitnessFunction, Genome, Individual, Population};

/// Shared state a model needs to create and score offspring.
pub struct StepContext<'a> {
    pub config: &'a EaConfig,
    pub fitness: &'a dyn FitnessFunction,
    /// Update being produced; recorded as the birth of offspring.
    pub update: u64,
    pub next_id: &'a mut u64,
    pub evaluations: &'a mut u64,
}

impl StepContext<'_> {
    fn take_id(&mut self) -> u64 {
        let id = *self.next_id;
        *self.next_id += 1;
        id
    }

    /// Mutate a genome and wrap it as a new, unevaluated individual.
    pub fn offspring(&mut self, mut genome: Genome, rng: &mut EaRng) -> Individual {
        mutate(
            &mut genome,
            &self.config.mutation,
            &self.config.representation,
            rng,
        );
        Individual::new(self.take_id(), genome, self.update)
    }

    /// Two mutated children of a recombined pair.
    pub fn breed_pair(
        &mut self,
        a: &Individual,
        b: &Individual,
        rng: &mut EaRng,
    ) -> (Individual, Individual) {
        let (x, y) = recombine(&a.genome, &b.genome, self.config.recombination, rng);
        (self.offspring(x, rng), self.offspring(y, rng))
    }

    /// One child from selected parents; two parents when recombination is on.
    pub fn breed(
        &mut self,
        selection: &SelectionMethod,
        population: &[Individual],
        rng: &mut EaRng,
    ) -> Individual {
        let first = select_index(selection, population, rng);
        if self.config.recombination == Recombination::Asexual {
            return self.offspring(population[first].genome.clone(), rng);
        }
        let second = select_index(selection, population, rng);
        let (child, _) = self.breed_pair(&population[first], &population[second], rng);
        child
    }

    /// Evaluate every unevaluated individual.
    pub fn evaluate(&mut self, individuals: &mut [Individual], rng: &mut EaRng) {
        *self.evaluations += evaluate_individuals(individuals, self.fitness, rng, false);
    }
}

/// Evaluate individuals in parallel.
///
/// Per-individual seeds are drawn from `rng` in order before the parallel
/// section, so results do not depend on scheduling. With `force` every
/// individual is re-evaluated. Returns the number of evaluations.
pub fn evaluate_individuals(
    individuals: &mut [Individual],
    fitness: &dyn FitnessFunction,
    rng: &mut EaRng,
    force: bool,
) -> u64 {
    let mut pending: Vec<(&mut Individual, u64)> = individuals
        .iter_mut()
        .filter(|i| force || !i.is_evaluated())
        .map(|i| (i, rng.next_u64()))
        .collect();

    pending.par_iter_mut().for_each(|(individual, seed)| {
        let mut stream = EaRng::seed_from_u64(*seed);
        individual.fitness = Some(fitness.evaluate(&individual.genome, &mut stream));
    });

    pending.len() as u64
}

/// Advance a population by one update with the given model.
pub fn advance(
    model: &GenerationalModel,
    population: &mut Population,
    ctx: &mut StepContext<'_>,
    rng: &mut EaRng,
) {
    if population.is_empty() {
        return;
    }

    match model {
        GenerationalModel::DeathBirth {
            selection,
            victim,
            replacement_rate,
        } => death_birth::advance(selection, *victim, *replacement_rate, population, ctx, rng),
        GenerationalModel::Generational { selection } => {
            generational::advance(selection, population, ctx, rng)
        }
        GenerationalModel::DeterministicCrowding => crowding::advance(population, ctx, rng),
        GenerationalModel::Nsga2 { tournament_size } => {
            nsga2::advance(*tournament_size, population, ctx, rng)
        }
        GenerationalModel::Elitism { elites, model } => {
            elitism::advance(*elites, model, population, ctx, rng)
        }
    }
}
