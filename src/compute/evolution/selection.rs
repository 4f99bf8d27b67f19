//! Parent and victim selection policies.

use rand::Rng;
use rand::seq::index;

use crate::schema::{SelectionMethod, VictimSelection};

use super::population::{by_fitness, ranked_indices};
use super::{EaRng, Individual};

/// Pick a parent index with the given method. The population must be non-empty.
pub fn select_index(method: &SelectionMethod, population: &[Individual], rng: &mut EaRng) -> usize {
    let n = population.len();
    match method {
        SelectionMethod::Proportionate => proportionate(population, rng),
        SelectionMethod::Tournament { size } => tournament(population, *size, rng),
        SelectionMethod::RankBased => {
            // Weight n for the best, 1 for the worst.
            let order = ranked_indices(population);
            let total = n * (n + 1) / 2;
            let mut target = rng.gen_range(0..total);
            for (i, &idx) in order.iter().enumerate() {
                let weight = n - i;
                if target < weight {
                    return idx;
                }
                target -= weight;
            }
            order[n - 1]
        }
        SelectionMethod::Elitist { top } => {
            let order = ranked_indices(population);
            order[rng.gen_range(0..(*top).clamp(1, n))]
        }
        SelectionMethod::Random => rng.gen_range(0..n),
    }
}

/// Roulette wheel over scalar fitness.
///
/// Fitness is shifted by the minimum when any value is negative; a zero total
/// falls back to a uniform draw.
fn proportionate(population: &[Individual], rng: &mut EaRng) -> usize {
    let n = population.len();
    let values: Vec<f64> = population
        .iter()
        .map(|i| {
            let f = i.scalar_fitness();
            if f.is_finite() { f } else { 0.0 }
        })
        .collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let shift = if min < 0.0 { -min } else { 0.0 };
    let total: f64 = values.iter().map(|v| v + shift).sum();

    if total <= 0.0 || !total.is_finite() {
        return rng.gen_range(0..n);
    }

    let target = rng.r#gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, v) in values.iter().enumerate() {
        cumulative += v + shift;
        if cumulative > target {
            return i;
        }
    }
    n - 1
}

/// Best of `size` uniformly drawn contestants (with replacement).
pub fn tournament(population: &[Individual], size: usize, rng: &mut EaRng) -> usize {
    let n = population.len();
    let mut best = rng.gen_range(0..n);
    for _ in 1..size.max(1) {
        let idx = rng.gen_range(0..n);
        if by_fitness(&population[idx], &population[best]).is_gt() {
            best = idx;
        }
    }
    best
}

/// Choose `count` distinct victims among `candidates` (indices into `population`).
pub fn select_victims(
    policy: VictimSelection,
    population: &[Individual],
    candidates: &[usize],
    count: usize,
    rng: &mut EaRng,
) -> Vec<usize> {
    let count = count.min(candidates.len());
    match policy {
        VictimSelection::Random => index::sample(rng, candidates.len(), count)
            .into_iter()
            .map(|i| candidates[i])
            .collect(),
        VictimSelection::Worst => {
            let mut sorted = candidates.to_vec();
            sorted.sort_by(|&a, &b| by_fitness(&population[a], &population[b]));
            sorted.truncate(count);
            sorted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::{Fitness, Genome};
    use rand::SeedableRng;

    fn population(values: &[f64]) -> Vec<Individual> {
        values
            .iter()
            .enumerate()
            .map(|(i, &f)| Individual {
                fitness: Some(Fitness::Unary(f)),
                ..Individual::new(i as u64, Genome::default(), 0)
            })
            .collect()
    }

    fn histogram(method: &SelectionMethod, values: &[f64], draws: usize) -> Vec<usize> {
        let pop = population(values);
        let mut rng = EaRng::seed_from_u64(17);
        let mut counts = vec![0; values.len()];
        for _ in 0..draws {
            counts[select_index(method, &pop, &mut rng)] += 1;
        }
        counts
    }

    #[test]
    fn test_proportionate_never_picks_zero() {
        let counts = histogram(&SelectionMethod::Proportionate, &[0.0, 1.0, 3.0], 4000);
        assert_eq!(counts[0], 0);
        assert!(counts[2] > counts[1] * 2);
    }

    #[test]
    fn test_proportionate_zero_total_is_uniform() {
        let counts = histogram(&SelectionMethod::Proportionate, &[0.0, 0.0, 0.0], 3000);
        assert!(counts.iter().all(|&c| c > 800));
    }

    #[test]
    fn test_proportionate_handles_negative() {
        let counts = histogram(&SelectionMethod::Proportionate, &[-2.0, -1.0, 0.0], 3000);
        assert_eq!(counts[0], 0);
        assert!(counts[2] > counts[1]);
    }

    #[test]
    fn test_elitist_only_top() {
        let counts = histogram(&SelectionMethod::Elitist { top: 2 }, &[5.0, 1.0, 9.0, 3.0], 1000);
        assert_eq!(counts[1] + counts[3], 0);
        assert!(counts[0] > 0 && counts[2] > 0);
    }

    #[test]
    fn test_tournament_favours_best() {
        let counts = histogram(&SelectionMethod::Tournament { size: 4 }, &[1.0, 2.0, 3.0, 4.0], 2000);
        assert!(counts[3] > counts[0] * 5);
    }

    #[test]
    fn test_rank_based_ordering() {
        let counts = histogram(&SelectionMethod::RankBased, &[1.0, 100.0, 10.0], 6000);
        assert!(counts[1] > counts[2] && counts[2] > counts[0]);
    }

    #[test]
    fn test_worst_victims() {
        let pop = population(&[5.0, 1.0, 9.0, 3.0]);
        let mut rng = EaRng::seed_from_u64(0);
        let victims = select_victims(VictimSelection::Worst, &pop, &[0, 1, 2, 3], 2, &mut rng);
        assert_eq!(victims, vec![1, 3]);

        let victims = select_victims(VictimSelection::Random, &pop, &[0, 2], 5, &mut rng);
        assert_eq!(victims.len(), 2);
    }
}
