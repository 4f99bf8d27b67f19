//! Compare isolated islands with ring migration on the XOR task.

use std::sync::Arc;

use markov_ea::{
    compute::evolution::{TrialEvaluator, XorTask},
    schema::{
        EmigrantSelection, GenomeTopology, MetaModel, MetaPopulationConfig, MigrationConfig,
        MigrationTopology,
    },
    MetaPopulation,
};

fn run(label: &str, model: MetaModel) {
    let mut config = MetaPopulationConfig {
        size: 4,
        model,
        random_seed: Some(7),
        ..Default::default()
    };
    config.island.representation.topology = GenomeTopology::Circular;
    config.island.population.size = 50;
    config.island.run.updates = 100;

    let island = &config.island;
    let fitness = TrialEvaluator::new(
        XorTask,
        island.markov.clone(),
        island.representation.topology,
        island.markov.trials,
    );

    let mut meta = match MetaPopulation::new(config, Arc::new(fitness)) {
        Ok(meta) => meta,
        Err(e) => {
            eprintln!("{label}: invalid configuration: {e}");
            return;
        }
    };

    match meta.run() {
        Ok(summary) => {
            let bests: Vec<String> = meta
                .islands()
                .iter()
                .map(|i| format!("{:.1}", i.stats().best_fitness))
                .collect();
            println!(
                "{label:<10} best {:>5.1}  mean {:>5.1}  islands [{}]  {:.2}s",
                summary.best_fitness,
                summary.final_avg_fitness,
                bests.join(", "),
                summary.elapsed_seconds
            );
        }
        Err(e) => eprintln!("{label}: run failed: {e}"),
    }
}

fn main() {
    env_logger::init();

    println!("=== Island model on XOR ===\n");
    run("isolated", MetaModel::Isolated);
    run(
        "ring",
        MetaModel::Migration(MigrationConfig {
            period: 10,
            rate: 0.1,
            topology: MigrationTopology::Ring,
            emigrants: EmigrantSelection::Best,
            ..Default::default()
        }),
    );
    run(
        "random",
        MetaModel::Migration(MigrationConfig {
            period: 10,
            rate: 0.1,
            topology: MigrationTopology::RandomRing,
            ..Default::default()
        }),
    );
}
