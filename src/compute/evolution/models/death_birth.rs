//! Steady-state death-birth process.

use log::trace;

use crate::compute::evolution::selection::select_victims;
use crate::compute::evolution::{EaRng, Individual, Population};
use crate::schema::{SelectionMethod, VictimSelection};

use super::StepContext;

/// Replacement events per update: `round(rate * size)`, at least one.
pub fn replacement_events(rate: f64, size: usize) -> usize {
    ((rate * size as f64).round() as usize).clamp(1, size.max(1))
}

pub(super) fn advance(
    selection: &SelectionMethod,
    victim: VictimSelection,
    replacement_rate: f64,
    population: &mut Population,
    ctx: &mut StepContext<'_>,
    rng: &mut EaRng,
) {
    let size = population.len();
    let events = replacement_events(replacement_rate, size);

    let mut offspring: Vec<Individual> = (0..events)
        .map(|_| ctx.breed(selection, population, rng))
        .collect();
    ctx.evaluate(&mut offspring, rng);

    // Victims are distinct, so no slot is replaced twice in one update.
    let candidates: Vec<usize> = (0..size).collect();
    let victims = select_victims(victim, population, &candidates, events, rng);
    trace!("death-birth: {} events, victims {:?}", events, victims);

    for (slot, child) in victims.into_iter().zip(offspring) {
        population[slot] = child;
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::compute::evolution::AllOnes;
    use crate::schema::GenerationalModel;
    use rand::SeedableRng;

    #[test]
    fn test_event_count() {
        assert_eq!(replacement_events(0.05, 100), 5);
        assert_eq!(replacement_events(0.05, 10), 1);
        assert_eq!(replacement_events(1.0, 10), 10);
    }

    #[test]
    fn test_five_replacements_per_update() {
        let config = bitstring_config(GenerationalModel::DeathBirth {
            selection: SelectionMethod::Proportionate,
            victim: VictimSelection::Random,
            replacement_rate: 0.05,
        });
        let mut rng = EaRng::seed_from_u64(12);
        let mut population = evaluated_population(100, &mut rng);

        let evaluations = run_once(&config, &AllOnes, &mut population, &mut rng);

        let newcomers = population.iter().filter(|i| i.id >= 1_000).count();
        assert_eq!(evaluations, 5);
        assert_eq!(newcomers, 5);
        assert_eq!(population.len(), 100);
    }

    #[test]
    fn test_worst_victims_replaced() {
        let config = bitstring_config(GenerationalModel::DeathBirth {
            selection: SelectionMethod::Random,
            victim: VictimSelection::Worst,
            replacement_rate: 0.1,
        });
        let mut rng = EaRng::seed_from_u64(3);
        let mut population = evaluated_population(20, &mut rng);
        let mut order: Vec<u64> = {
            let mut sorted = population.clone();
            sorted.sort_by(crate::compute::evolution::by_fitness);
            sorted.iter().map(|i| i.id).collect()
        };
        order.truncate(2);

        run_once(&config, &AllOnes, &mut population, &mut rng);
        assert!(population.iter().all(|i| !order.contains(&i.id)));
    }
}
