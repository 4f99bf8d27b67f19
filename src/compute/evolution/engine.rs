//! Single-population evolutionary algorithm and its run loop.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info};
use rand::SeedableRng;

use crate::schema::{
    ConfigError, EaConfig, EvolutionHistory, PopulationStats, RunSummary, StopReason,
};

use super::checkpoint::{
    CheckpointError, EaCheckpoint, checkpoint_path, load_json, save_json,
};
use super::genome::random_genome;
use super::models::{StepContext, advance, evaluate_individuals};
use super::population::{population_stats, ranked_indices};
use super::{EaRng, FitnessFunction, Individual, Population};

/// Errors from running an evolutionary algorithm.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Read-only view handed to run callbacks once per update.
#[derive(Debug)]
pub struct UpdateEvent<'a> {
    /// Updates completed so far.
    pub update: u64,
    /// Total updates the run will perform.
    pub total_updates: u64,
    pub population: &'a [Individual],
    pub stats: &'a PopulationStats,
}

/// One population with its own random stream and counters.
pub struct EvolutionaryAlgorithm {
    config: EaConfig,
    fitness: Arc<dyn FitnessFunction>,
    population: Population,
    rng: EaRng,
    update: u64,
    next_id: u64,
    evaluations: u64,
    best_fitness: Option<f64>,
    stagnation: u64,
    history: EvolutionHistory,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionaryAlgorithm {
    /// Validate the configuration and create an empty algorithm.
    pub fn new(config: EaConfig, fitness: Arc<dyn FitnessFunction>) -> Result<Self, ConfigError> {
        config.validate()?;
        config.model.check_objectives(fitness.objectives())?;
        let seed = config.random_seed.unwrap_or_else(rand::random);
        Ok(Self::with_rng(config, fitness, EaRng::seed_from_u64(seed)))
    }

    /// Create with an explicit stream; the configuration must already be valid.
    pub(crate) fn with_rng(config: EaConfig, fitness: Arc<dyn FitnessFunction>, rng: EaRng) -> Self {
        Self {
            config,
            fitness,
            population: Vec::new(),
            rng,
            update: 0,
            next_id: 0,
            evaluations: 0,
            best_fitness: None,
            stagnation: 0,
            history: EvolutionHistory::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start handing out ids at `base` (keeps ids unique across islands).
    pub fn with_id_base(mut self, base: u64) -> Self {
        self.next_id = base;
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &EaConfig {
        &self.config
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Mutable access for exchange between islands. Size changes are the caller's responsibility.
    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn rng_mut(&mut self) -> &mut EaRng {
        &mut self.rng
    }

    /// Updates completed.
    pub fn update(&self) -> u64 {
        self.update
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    /// Best scalar fitness seen so far.
    pub fn best_fitness(&self) -> Option<f64> {
        self.best_fitness
    }

    /// Updates since the best fitness last improved.
    pub fn stagnation(&self) -> u64 {
        self.stagnation
    }

    pub fn stats(&self) -> PopulationStats {
        population_stats(&self.population, self.update)
    }

    /// Replace the population with evaluated ancestors.
    pub fn initialize(&mut self) {
        self.population.clear();
        let individuals = self.random_individuals(self.config.population.size);
        self.population = individuals;
        self.track_best();
        debug!(
            "initialized {} individuals (ids from {})",
            self.population.len(),
            self.next_id - self.population.len() as u64
        );
    }

    /// Fresh, evaluated ancestors not yet placed in the population.
    pub fn random_individuals(&mut self, count: usize) -> Vec<Individual> {
        let mut individuals: Vec<Individual> = (0..count)
            .map(|_| {
                let genome = random_genome(&self.config, &mut self.rng);
                let id = self.next_id;
                self.next_id += 1;
                Individual::new(id, genome, self.update)
            })
            .collect();
        self.evaluate_slice(&mut individuals, false);
        individuals
    }

    fn evaluate_slice(&mut self, individuals: &mut [Individual], force: bool) {
        self.evaluations +=
            evaluate_individuals(individuals, self.fitness.as_ref(), &mut self.rng, force);
    }

    /// Evaluate unevaluated individuals, or everyone when re-evaluation is on.
    pub fn evaluate(&mut self) {
        let force = self.config.population.reevaluate;
        let mut population = std::mem::take(&mut self.population);
        self.evaluate_slice(&mut population, force);
        self.population = population;
    }

    /// Perform one update: evaluate, then advance the generational model once.
    pub fn step(&mut self) -> PopulationStats {
        if self.population.is_empty() {
            self.initialize();
        }
        self.evaluate();

        let mut population = std::mem::take(&mut self.population);
        {
            let mut ctx = StepContext {
                config: &self.config,
                fitness: self.fitness.as_ref(),
                update: self.update + 1,
                next_id: &mut self.next_id,
                evaluations: &mut self.evaluations,
            };
            advance(&self.config.model, &mut population, &mut ctx, &mut self.rng);
        }
        self.population = population;
        self.update += 1;

        self.track_best();
        let stats = self.stats();
        self.history.record(&stats);

        let period = self.config.run.recording_period.max(1);
        if self.update % period == 0 {
            info!(
                "update {}: best {:.4}, mean {:.4}, std {:.4}, mean length {:.1}",
                stats.update,
                stats.best_fitness,
                stats.mean_fitness,
                stats.fitness_std,
                stats.mean_genome_len
            );
        }
        stats
    }

    fn track_best(&mut self) {
        let current = self
            .population
            .iter()
            .filter(|i| i.is_evaluated())
            .map(Individual::scalar_fitness)
            .fold(None, |best: Option<f64>, f| Some(best.map_or(f, |b| b.max(f))));

        match (current, self.best_fitness) {
            (Some(c), Some(b)) if c <= b => self.stagnation += 1,
            (Some(c), _) => {
                self.best_fitness = Some(c);
                self.stagnation = 0;
            }
            (None, _) => {}
        }
    }

    /// The fittest individuals, best first.
    pub fn top(&self, n: usize) -> Vec<&Individual> {
        ranked_indices(&self.population)
            .into_iter()
            .take(n)
            .map(|i| &self.population[i])
            .collect()
    }

    /// Check if the run should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.update >= self.config.run.total_updates() {
            return Some(StopReason::MaxUpdates);
        }

        if let Some(target) = self.config.run.target_fitness
            && self.best_fitness.is_some_and(|b| b >= target)
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = self.config.run.stagnation_limit
            && self.stagnation >= limit
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Whether a checkpoint is due after the current update.
    fn checkpoint_due(&self) -> bool {
        let checkpoint = &self.config.checkpoint;
        if !checkpoint.enabled || self.update == 0 {
            return false;
        }
        let epoch_end = self.update % self.config.run.updates == 0;
        let periodic = checkpoint.period.is_some_and(|p| self.update % p == 0);
        epoch_end || periodic
    }

    /// Run to completion, invoking `callback` after every update.
    ///
    /// Continues from the current state, so a restored algorithm resumes
    /// where its checkpoint left off.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<RunSummary, EngineError>
    where
        F: FnMut(&UpdateEvent<'_>),
    {
        let start_time = Instant::now();
        let start_evaluations = self.evaluations;
        let total_updates = self.config.run.total_updates();

        if self.population.is_empty() {
            self.initialize();
        }

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            let stats = self.step();
            callback(&UpdateEvent {
                update: self.update,
                total_updates,
                population: &self.population,
                stats: &stats,
            });

            if self.update % self.config.run.updates == 0 {
                info!(
                    "epoch {} complete at update {}",
                    self.update / self.config.run.updates,
                    self.update
                );
            }
            if self.checkpoint_due() {
                let path = checkpoint_path(&self.config.checkpoint, self.update);
                self.save_checkpoint(&path)?;
                debug!("checkpoint written to {}", path.display());
            }
        };

        let final_stats = self.stats();
        Ok(RunSummary {
            updates: self.update,
            evaluations: self.evaluations - start_evaluations,
            best_fitness: self.best_fitness.unwrap_or(f64::NEG_INFINITY),
            final_avg_fitness: final_stats.mean_fitness,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
            stop_reason,
        })
    }

    /// Run to completion without a callback.
    pub fn run(&mut self) -> Result<RunSummary, EngineError> {
        self.run_with_callback(|_| {})
    }

    /// Snapshot of all resumable state.
    pub fn checkpoint(&self) -> EaCheckpoint {
        EaCheckpoint {
            update: self.update,
            next_id: self.next_id,
            evaluations: self.evaluations,
            best_fitness: self.best_fitness,
            stagnation: self.stagnation,
            rng: self.rng.clone(),
            population: self.population.clone(),
            history: self.history.clone(),
        }
    }

    /// Restore state from a snapshot taken with the same configuration.
    pub fn restore(&mut self, checkpoint: EaCheckpoint) -> Result<(), CheckpointError> {
        let expected = self.config.population.size;
        if checkpoint.population.len() != expected {
            return Err(CheckpointError::Mismatch(format!(
                "population holds {} individuals, configuration expects {expected}",
                checkpoint.population.len()
            )));
        }

        self.update = checkpoint.update;
        self.next_id = checkpoint.next_id;
        self.evaluations = checkpoint.evaluations;
        self.best_fitness = checkpoint.best_fitness;
        self.stagnation = checkpoint.stagnation;
        self.rng = checkpoint.rng;
        self.population = checkpoint.population;
        self.history = checkpoint.history;
        Ok(())
    }

    pub fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        save_json(&self.checkpoint(), path)
    }

    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CheckpointError> {
        let checkpoint: EaCheckpoint = load_json(path)?;
        self.restore(checkpoint)
    }
}
