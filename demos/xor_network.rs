//! Evolve a Markov network that computes XOR of its two inputs.

use std::sync::Arc;

use markov_ea::{
    compute::evolution::{TrialEvaluator, XorTask},
    compute::markov::{MarkovNetwork, constant_input},
    schema::{EaConfig, GenerationalModel, GenomeTopology, SelectionMethod, VictimSelection},
    EvolutionaryAlgorithm,
};

fn main() {
    env_logger::init();

    let mut config = EaConfig::default();
    config.representation.topology = GenomeTopology::Circular;
    config.population.size = 200;
    config.model = GenerationalModel::DeathBirth {
        selection: SelectionMethod::Tournament { size: 4 },
        victim: VictimSelection::Random,
        replacement_rate: 0.1,
    };
    config.run.updates = 300;
    config.run.target_fitness = Some(config.markov.trials as f64);
    config.random_seed = Some(42);

    let fitness = TrialEvaluator::new(
        XorTask,
        config.markov.clone(),
        config.representation.topology,
        config.markov.trials,
    );
    let markov = config.markov.clone();
    let topology = config.representation.topology;

    let mut ea = match EvolutionaryAlgorithm::new(config, Arc::new(fitness)) {
        Ok(ea) => ea,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let summary = match ea.run_with_callback(|event| {
        if event.update % 25 == 0 {
            println!(
                "update {:>4}: best {:>5.1}  mean {:>5.1}",
                event.update, event.stats.best_fitness, event.stats.mean_fitness
            );
        }
    }) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Run failed: {e}");
            std::process::exit(1);
        }
    };

    println!();
    println!(
        "Stopped after {} updates ({:?}), best fitness {:.1}",
        summary.updates, summary.stop_reason, summary.best_fitness
    );

    let Some(best) = ea.top(1).first().copied() else {
        return;
    };
    let mut network = MarkovNetwork::from_genome(&best.genome, &markov, topology, 0);
    println!(
        "Best genome: {} codons, {} gates",
        best.genome.len(),
        network.gates().len()
    );
    println!("a b | out");
    for (a, b) in [(0u8, 0u8), (0, 1), (1, 0), (1, 1)] {
        network.clear();
        let outputs = network.update_n(markov.update_n, constant_input(&[a, b]));
        println!("{a} {b} | {}", outputs.first().copied().unwrap_or(0));
    }
}
