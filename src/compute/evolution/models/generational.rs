//! Non-overlapping generations.

use crate::compute::evolution::{EaRng, Individual, Population};
use crate::schema::SelectionMethod;

use super::StepContext;

/// Replace the whole population with offspring of selected parents.
pub(super) fn advance(
    selection: &SelectionMethod,
    population: &mut Population,
    ctx: &mut StepContext<'_>,
    rng: &mut EaRng,
) {
    let size = population.len();
    let mut next: Vec<Individual> = (0..size)
        .map(|_| ctx.breed(selection, population, rng))
        .collect();
    ctx.evaluate(&mut next, rng);
    *population = next;
}
