//! NSGA-II: non-dominated sorting with crowding distance.
//!
//! All objectives are maximised. Rank is the front index; crowding distance
//! is the sum over objectives of the normalised gap between neighbours, with
//! infinite distance at the front boundaries.

use std::cmp::Ordering;

use rand::Rng;

use crate::compute::evolution::{EaRng, Individual, Population};

use super::StepContext;

fn objectives(individual: &Individual) -> &[f64] {
    match &individual.fitness {
        Some(fitness) => fitness.objectives(),
        None => &[],
    }
}

fn dominates(a: &Individual, b: &Individual) -> bool {
    match (&a.fitness, &b.fitness) {
        (Some(x), Some(y)) => x.dominates(y),
        (Some(_), None) => true,
        _ => false,
    }
}

/// Partition indices into Pareto fronts, best front first.
pub fn non_dominated_fronts(population: &[Individual]) -> Vec<Vec<usize>> {
    let n = population.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];

    for p in 0..n {
        for q in (p + 1)..n {
            if dominates(&population[p], &population[q]) {
                dominated_by[p].push(q);
                domination_count[q] += 1;
            } else if dominates(&population[q], &population[p]) {
                dominated_by[q].push(p);
                domination_count[p] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &p in &current {
            for &q in &dominated_by[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        fronts.push(current);
        current = next;
    }
    fronts
}

/// Crowding distance of each member of `front`, in the same order.
pub fn crowding_distance(population: &[Individual], front: &[usize]) -> Vec<f64> {
    let len = front.len();
    let mut distance = vec![0.0; len];
    if len <= 2 {
        distance.fill(f64::INFINITY);
        return distance;
    }

    let m = front
        .iter()
        .map(|&i| objectives(&population[i]).len())
        .max()
        .unwrap_or(0);
    let value = |i: usize, k: usize| objectives(&population[front[i]]).get(k).copied().unwrap_or(0.0);

    let mut order: Vec<usize> = (0..len).collect();
    for k in 0..m {
        order.sort_by(|&a, &b| value(a, k).total_cmp(&value(b, k)));
        let lo = value(order[0], k);
        let hi = value(order[len - 1], k);
        distance[order[0]] = f64::INFINITY;
        distance[order[len - 1]] = f64::INFINITY;

        let span = hi - lo;
        if span <= 0.0 {
            continue;
        }
        for w in 1..len - 1 {
            let gap = value(order[w + 1], k) - value(order[w - 1], k);
            distance[order[w]] += gap / span;
        }
    }
    distance
}

/// Recompute rank and crowding attributes for a whole population.
pub fn assign_rank_and_crowding(population: &mut [Individual]) -> Vec<Vec<usize>> {
    let fronts = non_dominated_fronts(population);
    for (rank, front) in fronts.iter().enumerate() {
        let distance = crowding_distance(population, front);
        for (&i, d) in front.iter().zip(distance) {
            population[i].attributes.rank = rank;
            population[i].attributes.crowding = d;
        }
    }
    fronts
}

/// Crowded-comparison: lower rank wins, then larger crowding distance.
fn crowded_cmp(a: &Individual, b: &Individual) -> Ordering {
    b.attributes
        .rank
        .cmp(&a.attributes.rank)
        .then(a.attributes.crowding.total_cmp(&b.attributes.crowding))
}

fn crowded_tournament(population: &[Individual], size: usize, rng: &mut EaRng) -> usize {
    let n = population.len();
    let mut best = rng.gen_range(0..n);
    for _ in 1..size.max(1) {
        let idx = rng.gen_range(0..n);
        if crowded_cmp(&population[idx], &population[best]).is_gt() {
            best = idx;
        }
    }
    best
}

pub(super) fn advance(
    tournament_size: usize,
    population: &mut Population,
    ctx: &mut StepContext<'_>,
    rng: &mut EaRng,
) {
    let size = population.len();
    assign_rank_and_crowding(population);

    let mut offspring: Vec<Individual> = Vec::with_capacity(size + 1);
    while offspring.len() < size {
        let a = crowded_tournament(population, tournament_size, rng);
        let b = crowded_tournament(population, tournament_size, rng);
        let (x, y) = ctx.breed_pair(&population[a], &population[b], rng);
        offspring.push(x);
        offspring.push(y);
    }
    offspring.truncate(size);
    ctx.evaluate(&mut offspring, rng);

    let mut merged: Vec<Individual> = population.drain(..).chain(offspring).collect();
    let fronts = assign_rank_and_crowding(&mut merged);

    let mut keep: Vec<usize> = Vec::with_capacity(size);
    for front in fronts {
        if keep.len() + front.len() <= size {
            keep.extend(front);
            continue;
        }
        let mut last = front;
        last.sort_by(|&a, &b| {
            merged[b]
                .attributes
                .crowding
                .total_cmp(&merged[a].attributes.crowding)
        });
        last.truncate(size - keep.len());
        keep.extend(last);
        break;
    }

    keep.sort_unstable();
    let mut slots: Vec<Option<Individual>> = merged.into_iter().map(Some).collect();
    population.extend(keep.into_iter().filter_map(|i| slots[i].take()));
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::compute::evolution::{Fitness, Genome, MultiAllOnes};
    use crate::schema::GenerationalModel;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn multi(id: u64, values: &[f64]) -> Individual {
        Individual {
            fitness: Some(Fitness::Multi(values.to_vec())),
            ..Individual::new(id, Genome::default(), 0)
        }
    }

    #[test]
    fn test_fronts() {
        let population = vec![
            multi(0, &[1.0, 1.0]),
            multi(1, &[3.0, 1.0]),
            multi(2, &[1.0, 3.0]),
            multi(3, &[0.0, 0.0]),
            multi(4, &[2.0, 2.0]),
        ];
        let fronts = non_dominated_fronts(&population);
        let mut first = fronts[0].clone();
        first.sort();
        assert_eq!(first, vec![1, 2, 4]);
        assert_eq!(fronts[1], vec![0]);
        assert_eq!(fronts[2], vec![3]);
    }

    #[test]
    fn test_boundary_crowding_is_infinite() {
        let population = vec![
            multi(0, &[0.0, 4.0]),
            multi(1, &[1.0, 3.0]),
            multi(2, &[2.0, 2.0]),
            multi(3, &[4.0, 0.0]),
        ];
        let front = vec![0, 1, 2, 3];
        let distance = crowding_distance(&population, &front);
        assert!(distance[0].is_infinite());
        assert!(distance[3].is_infinite());
        // (2 - 0) / 4 + (4 - 2) / 4 = 1
        assert!((distance[1] - 1.0).abs() < 1e-12);
        // (4 - 1) / 4 + (3 - 0) / 4 = 1.5
        assert!((distance[2] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_advance_keeps_first_front() {
        let config = bitstring_config(GenerationalModel::Nsga2 { tournament_size: 2 });
        let fitness = MultiAllOnes { objectives: 2 };
        let mut rng = EaRng::seed_from_u64(5);
        let mut population = evaluated_population(16, &mut rng);
        super::super::evaluate_individuals(&mut population, &fitness, &mut rng, true);

        let max_objective = |population: &[Individual], k: usize| {
            population
                .iter()
                .map(|i| objectives(i)[k])
                .fold(f64::NEG_INFINITY, f64::max)
        };
        for _ in 0..5 {
            let before = [max_objective(&population, 0), max_objective(&population, 1)];
            run_once(&config, &fitness, &mut population, &mut rng);
            assert_eq!(population.len(), 16);
            // Per-objective maxima sit on a front boundary and always survive.
            assert!(max_objective(&population, 0) >= before[0]);
            assert!(max_objective(&population, 1) >= before[1]);
        }
    }

    proptest! {
        #[test]
        fn prop_dominance_orders_fronts(
            values in proptest::collection::vec((0u8..6, 0u8..6), 2..30),
        ) {
            let population: Vec<Individual> = values
                .iter()
                .enumerate()
                .map(|(i, &(a, b))| multi(i as u64, &[a as f64, b as f64]))
                .collect();
            let mut rank = vec![0; population.len()];
            for (r, front) in non_dominated_fronts(&population).iter().enumerate() {
                for &i in front {
                    rank[i] = r;
                }
            }
            for a in 0..population.len() {
                for b in 0..population.len() {
                    if dominates(&population[a], &population[b]) {
                        prop_assert!(rank[a] < rank[b]);
                    }
                }
            }
        }
    }
}
