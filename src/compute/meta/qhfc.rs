//! Quick hierarchical fair competition: islands as fitness tiers.
//!
//! Island index is the tier, 0 being the lowest. Individuals that clear a
//! higher tier's admission threshold are exported upward. When an island
//! stops improving, fresh random individuals enter at the base tier, and a
//! stalled upper tier trades its worst for the best of the tier below.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::compute::evolution::{
    EvolutionaryAlgorithm, Individual, Population, by_fitness, ranked_indices,
};
use crate::schema::QhfcConfig;

/// Tier bookkeeping carried between updates and stored in checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QhfcState {
    /// Whether the initial populations have been re-dealt into tiers.
    pub stratified: bool,
    /// Admission threshold of tiers `1..L`; tier 0 admits everyone.
    pub admission: Vec<f64>,
    /// Best fitness of each island when it last improved.
    pub last_best: Vec<Option<f64>>,
    /// Updates since each island last improved.
    pub no_progress: Vec<u64>,
}

impl QhfcState {
    pub fn new(islands: usize) -> Self {
        Self {
            stratified: false,
            admission: Vec::new(),
            last_best: vec![None; islands],
            no_progress: vec![0; islands],
        }
    }

    /// Pool every individual and deal them back so island order follows fitness.
    pub fn stratify(&mut self, populations: &mut [Population]) {
        let sizes: Vec<usize> = populations.iter().map(Vec::len).collect();
        let mut pool: Vec<Individual> = populations.iter_mut().flat_map(std::mem::take).collect();
        pool.sort_by(by_fitness);

        let mut pool = pool.into_iter();
        for (population, size) in populations.iter_mut().zip(sizes) {
            population.extend(pool.by_ref().take(size));
        }
        self.update_thresholds(populations);
        self.stratified = true;
        debug!("stratified {} islands into fitness tiers", populations.len());
    }

    /// Recompute `mean + k/L * (max - mean)` over all evaluated individuals.
    pub fn update_thresholds(&mut self, populations: &[Population]) {
        let fitness: Vec<f64> = populations
            .iter()
            .flatten()
            .filter(|i| i.is_evaluated())
            .map(Individual::scalar_fitness)
            .filter(|f| f.is_finite())
            .collect();
        if fitness.is_empty() {
            self.admission.clear();
            return;
        }

        let mean = fitness.iter().sum::<f64>() / fitness.len() as f64;
        let max = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let tiers = populations.len();
        self.admission = (1..tiers)
            .map(|k| mean + k as f64 / tiers as f64 * (max - mean))
            .collect();
    }

    /// Threshold to enter `tier`.
    pub fn admission(&self, tier: usize) -> f64 {
        match tier {
            0 => f64::NEG_INFINITY,
            k => self.admission.get(k - 1).copied().unwrap_or(f64::INFINITY),
        }
    }

    /// Highest tier above `tier` that admits `fitness`.
    fn destination(&self, tier: usize, fitness: f64, tiers: usize) -> Option<usize> {
        ((tier + 1)..tiers).rev().find(|&h| fitness >= self.admission(h))
    }

    /// Swap qualifying individuals with the worst of a higher tier.
    ///
    /// The top `detect` of each tier are inspected, highest tiers first. An
    /// exchange only happens when the candidate beats the destination's worst,
    /// so every island keeps its size. Returns the number of exports.
    pub fn export(&self, populations: &mut [Population], detect: usize) -> usize {
        let tiers = populations.len();
        let mut exported = 0;

        for tier in (0..tiers.saturating_sub(1)).rev() {
            let candidates: Vec<usize> = ranked_indices(&populations[tier])
                .into_iter()
                .take(detect)
                .collect();

            for idx in candidates {
                let fitness = populations[tier][idx].scalar_fitness();
                let Some(dest) = self.destination(tier, fitness, tiers) else {
                    continue;
                };
                let (lower, upper) = populations.split_at_mut(dest);
                let target = &mut upper[0];
                let Some(worst) = target
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| by_fitness(a, b))
                    .map(|(i, _)| i)
                else {
                    continue;
                };
                if fitness > target[worst].scalar_fitness() {
                    std::mem::swap(&mut lower[tier][idx], &mut target[worst]);
                    exported += 1;
                }
            }
        }

        if exported > 0 {
            debug!("qhfc exported {exported} individuals");
        }
        exported
    }

    /// Update per-island progress and return islands that have stalled.
    ///
    /// Stalled islands have their counters reset.
    pub fn stalled(&mut self, populations: &[Population], limit: u64) -> Vec<usize> {
        self.last_best.resize(populations.len(), None);
        self.no_progress.resize(populations.len(), 0);

        let mut stalled = Vec::new();
        for (i, population) in populations.iter().enumerate() {
            let best = population
                .iter()
                .filter(|ind| ind.is_evaluated())
                .map(Individual::scalar_fitness)
                .fold(None, |b: Option<f64>, f| Some(b.map_or(f, |b| b.max(f))));

            match (best, self.last_best[i]) {
                (Some(current), Some(previous)) if current <= previous => {
                    self.no_progress[i] += 1;
                }
                (Some(current), _) => {
                    self.last_best[i] = Some(current);
                    self.no_progress[i] = 0;
                }
                (None, _) => self.no_progress[i] += 1,
            }

            if self.no_progress[i] >= limit {
                self.no_progress[i] = 0;
                self.last_best[i] = None;
                stalled.push(i);
            }
        }
        stalled
    }

    /// Bookkeeping run once every island has finished `update`.
    pub fn after_update(
        &mut self,
        config: &QhfcConfig,
        islands: &mut [EvolutionaryAlgorithm],
        update: u64,
    ) {
        if update % config.breed_top_freq == 0
            && let Some(top) = islands.last_mut()
        {
            top.step();
        }

        let stalled = super::exchange(islands, |populations| {
            if update % config.catchup_gen == 0 {
                self.update_thresholds(populations);
            }
            self.export(populations, config.detect_export_num);
            let stalled = self.stalled(populations, config.no_progress_gen);
            for &tier in stalled.iter().filter(|&&tier| tier > 0) {
                let count = config.refill_count(populations[tier].len());
                demote(populations, tier, count);
            }
            stalled
        });

        if stalled.is_empty() {
            return;
        }
        if let Some(base) = islands.first_mut() {
            let count = config.refill_count(base.population().len());
            let fresh = base.random_individuals(count);
            refill(base.population_mut(), fresh);
            debug!("qhfc refilled {count} base individuals after stalls on {stalled:?}");
        }
    }
}

/// Trade the `count` worst of `tier` for the `count` best of the tier below.
pub fn demote(populations: &mut [Population], tier: usize, count: usize) {
    if tier == 0 || tier >= populations.len() {
        return;
    }
    let (lower, upper) = populations.split_at_mut(tier);
    let below = &mut lower[tier - 1];
    let stalled = &mut upper[0];

    let mut worst = ranked_indices(stalled);
    worst.reverse();
    let best = ranked_indices(below);
    for (w, b) in worst.into_iter().zip(best).take(count) {
        std::mem::swap(&mut stalled[w], &mut below[b]);
    }
}

/// Replace the worst residents with `fresh`, one for one.
pub fn refill(population: &mut Population, fresh: Vec<Individual>) {
    let mut order: Vec<usize> = (0..population.len()).collect();
    order.sort_by(|&a, &b| by_fitness(&population[a], &population[b]));
    for (slot, individual) in order.into_iter().zip(fresh) {
        population[slot] = individual;
    }
}
