//! QHFC over bitstring islands evolving toward all ones.

use std::sync::Arc;

use markov_ea::{
    compute::evolution::AllOnes,
    schema::{
        Ancestor, GenerationalModel, MetaModel, MetaPopulationConfig, QhfcConfig, SiteMutation,
    },
    MetaPopulation,
};

fn main() {
    env_logger::init();

    let mut config = MetaPopulationConfig {
        size: 5,
        model: MetaModel::Qhfc(QhfcConfig::default()),
        random_seed: Some(1),
        ..Default::default()
    };
    let island = &mut config.island;
    island.representation.ancestor = Ancestor::RandomBitstring;
    island.representation.initial_size = 100;
    island.representation.min_size = 100;
    island.representation.max_size = 100;
    island.mutation.site = SiteMutation::BitFlip;
    island.mutation.per_site_p = 0.01;
    island.population.size = 40;
    island.model = GenerationalModel::Elitism {
        elites: 1,
        model: Box::new(GenerationalModel::DeterministicCrowding),
    };
    island.run.updates = 200;
    island.run.target_fitness = Some(100.0);

    let mut meta = match MetaPopulation::new(config, Arc::new(AllOnes)) {
        Ok(meta) => meta,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let result = meta.run_with_callback(|event| {
        if event.update % 20 == 0 {
            let tiers: Vec<String> = event
                .islands
                .iter()
                .map(|i| format!("{:>5.1}", i.stats().mean_fitness))
                .collect();
            println!("update {:>4}: tier means [{}]", event.update, tiers.join(" "));
        }
    });

    match result {
        Ok(summary) => println!(
            "\nStopped after {} updates ({:?}), best {:.0}/100",
            summary.updates, summary.stop_reason, summary.best_fitness
        ),
        Err(e) => eprintln!("Run failed: {e}"),
    }
}
