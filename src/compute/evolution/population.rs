//! Individuals and populations.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::schema::PopulationStats;

use super::{Fitness, Genome};

/// Model-specific bookkeeping attached to an individual.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    /// Pareto front index (0 = non-dominated).
    pub rank: usize,
    /// NSGA-II crowding distance. Front boundaries are infinite.
    #[serde(with = "distance")]
    pub crowding: f64,
    /// Carried over by an elitism wrapper.
    pub elite: bool,
}

/// JSON has no infinity, so infinite distances are written as `null`.
mod distance {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        value.is_finite().then_some(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// A genome with its fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// Unique identifier.
    pub id: u64,
    pub genome: Genome,
    /// `None` until evaluated.
    pub fitness: Option<Fitness>,
    /// Update the individual was born in.
    pub birth: u64,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Individual {
    pub fn new(id: u64, genome: Genome, birth: u64) -> Self {
        Self {
            id,
            genome,
            fitness: None,
            birth,
            attributes: Attributes::default(),
        }
    }

    /// Scalar fitness, negative infinity when unevaluated.
    #[inline]
    pub fn scalar_fitness(&self) -> f64 {
        self.fitness
            .as_ref()
            .map_or(f64::NEG_INFINITY, Fitness::scalar)
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }
}

/// Compare two individuals by scalar fitness, ascending.
#[inline]
pub fn by_fitness(a: &Individual, b: &Individual) -> Ordering {
    a.scalar_fitness().total_cmp(&b.scalar_fitness())
}

/// Ordered collection of individuals.
pub type Population = Vec<Individual>;

/// Indices of a population sorted best first.
pub fn ranked_indices(population: &[Individual]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..population.len()).collect();
    order.sort_by(|&a, &b| by_fitness(&population[b], &population[a]));
    order
}

/// Index of the least fit individual.
pub fn worst_index(population: &[Individual]) -> Option<usize> {
    (0..population.len()).min_by(|&a, &b| by_fitness(&population[a], &population[b]))
}

/// Fitness summary over the evaluated members of a population.
pub fn population_stats(population: &[Individual], update: u64) -> PopulationStats {
    let size = population.len();
    if size == 0 {
        return PopulationStats {
            update,
            ..Default::default()
        };
    }

    let values: Vec<f64> = population
        .iter()
        .filter_map(|i| i.fitness.as_ref().map(Fitness::scalar))
        .collect();
    let mean_genome_len =
        population.iter().map(|i| i.genome.len()).sum::<usize>() as f64 / size as f64;

    if values.is_empty() {
        return PopulationStats {
            update,
            size,
            mean_genome_len,
            ..Default::default()
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    PopulationStats {
        update,
        size,
        best_fitness: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean_fitness: mean,
        min_fitness: values.iter().copied().fold(f64::INFINITY, f64::min),
        fitness_std: variance.sqrt(),
        mean_genome_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: u64, fitness: f64) -> Individual {
        Individual {
            fitness: Some(Fitness::Unary(fitness)),
            ..Individual::new(id, Genome::new(vec![0; 4]), 0)
        }
    }

    #[test]
    fn test_ranking() {
        let population = vec![scored(0, 1.0), scored(1, 5.0), scored(2, 3.0)];
        assert_eq!(ranked_indices(&population), vec![1, 2, 0]);
        assert_eq!(worst_index(&population), Some(0));
    }

    #[test]
    fn test_infinite_crowding_survives_json() {
        let mut boundary = scored(0, 1.0);
        boundary.attributes.crowding = f64::INFINITY;
        let mut inner = scored(1, 2.0);
        inner.attributes.crowding = 0.75;
        let population = vec![boundary, inner];

        let json = serde_json::to_string(&population).unwrap();
        let back: Population = serde_json::from_str(&json).unwrap();
        assert_eq!(back, population);
        assert!(back[0].attributes.crowding.is_infinite());
    }

    #[test]
    fn test_unevaluated_ranks_last() {
        let population = vec![Individual::new(0, Genome::default(), 0), scored(1, -3.0)];
        assert_eq!(worst_index(&population), Some(0));
    }

    #[test]
    fn test_stats() {
        let population = vec![scored(0, 2.0), scored(1, 4.0)];
        let stats = population_stats(&population, 7);
        assert_eq!(stats.update, 7);
        assert_eq!(stats.size, 2);
        assert!((stats.mean_fitness - 3.0).abs() < 1e-12);
        assert!((stats.fitness_std - 1.0).abs() < 1e-12);
        assert_eq!(stats.best_fitness, 4.0);
        assert_eq!(stats.min_fitness, 2.0);
        assert_eq!(stats.mean_genome_len, 4.0);
    }
}
