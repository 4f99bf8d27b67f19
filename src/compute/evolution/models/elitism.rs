//! Elitism wrapper around any other model.

use crate::compute::evolution::population::{by_fitness, ranked_indices};
use crate::compute::evolution::{EaRng, Individual, Population};
use crate::schema::GenerationalModel;

use super::StepContext;

/// Run the wrapped model, then make sure the prior top `elites` survive.
///
/// Missing elites replace the worst non-elite newcomers unmodified.
pub(super) fn advance(
    elites: usize,
    model: &GenerationalModel,
    population: &mut Population,
    ctx: &mut StepContext<'_>,
    rng: &mut EaRng,
) {
    let carried: Vec<Individual> = ranked_indices(population)
        .into_iter()
        .take(elites.min(population.len().saturating_sub(1)))
        .map(|i| population[i].clone())
        .collect();

    super::advance(model, population, ctx, rng);

    for individual in population.iter_mut() {
        individual.attributes.elite = false;
    }

    for mut elite in carried {
        elite.attributes.elite = true;
        if let Some(present) = population.iter_mut().find(|i| i.id == elite.id) {
            present.attributes.elite = true;
            continue;
        }

        let worst = population
            .iter()
            .enumerate()
            .filter(|(_, i)| !i.attributes.elite)
            .min_by(|(_, a), (_, b)| by_fitness(a, b))
            .map(|(idx, _)| idx);
        if let Some(slot) = worst {
            population[slot] = elite;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::compute::evolution::AllOnes;
    use crate::schema::SelectionMethod;
    use rand::SeedableRng;

    #[test]
    fn test_elites_survive_full_replacement() {
        let config = bitstring_config(GenerationalModel::Elitism {
            elites: 3,
            model: Box::new(GenerationalModel::Generational {
                selection: SelectionMethod::Random,
            }),
        });
        let mut rng = EaRng::seed_from_u64(8);
        let mut population = evaluated_population(20, &mut rng);
        let top: Vec<u64> = ranked_indices(&population)
            .into_iter()
            .take(3)
            .map(|i| population[i].id)
            .collect();

        run_once(&config, &AllOnes, &mut population, &mut rng);

        assert_eq!(population.len(), 20);
        for id in top {
            let kept = population.iter().find(|i| i.id == id).unwrap();
            assert!(kept.attributes.elite);
        }
        assert_eq!(population.iter().filter(|i| i.attributes.elite).count(), 3);
    }
}
