//! Quick evolution performance test

use markov_ea::{
    compute::evolution::{TrialEvaluator, XorTask},
    schema::{EaConfig, GenomeTopology},
    EvolutionaryAlgorithm,
};
use std::sync::Arc;
use std::time::Instant;

fn xor_config(population: usize, genome_len: usize) -> EaConfig {
    let mut config = EaConfig::default();
    config.representation.topology = GenomeTopology::Circular;
    config.representation.initial_size = genome_len;
    config.representation.max_size = config.representation.max_size.max(genome_len);
    config.population.size = population;
    config.run.updates = 20;
    config.random_seed = Some(42);
    config
}

fn measure(config: EaConfig) {
    let fitness = TrialEvaluator::new(
        XorTask,
        config.markov.clone(),
        config.representation.topology,
        config.markov.trials,
    );
    let mut ea = match EvolutionaryAlgorithm::new(config, Arc::new(fitness)) {
        Ok(ea) => ea,
        Err(e) => {
            println!("  Skipped: {e}");
            return;
        }
    };

    let start = Instant::now();
    let summary = match ea.run() {
        Ok(summary) => summary,
        Err(e) => {
            println!("  Failed: {e}");
            return;
        }
    };
    let elapsed = start.elapsed();
    let evals_per_sec = summary.evaluations as f64 / elapsed.as_secs_f64();

    println!("  Updates:        {}", summary.updates);
    println!("  Evaluations:    {}", summary.evaluations);
    println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
    println!("  Evals/sec:      {:.1}", evals_per_sec);
    println!("  Best fitness:   {:.1}", summary.best_fitness);
    println!();
}

fn main() {
    println!("=== Evolution Performance Test ===\n");

    for genome_len in [1000, 5000, 20000] {
        println!("Genome length: {genome_len}");
        measure(xor_config(100, genome_len));
    }

    println!("=== Scalability Test (fixed 5000-codon genomes) ===\n");

    for population in [50, 100, 200, 400] {
        println!("Population: {population}");
        measure(xor_config(population, 5000));
    }
}
