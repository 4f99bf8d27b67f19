//! Benchmarks for genome decoding and the Markov network runtime.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;

use markov_ea::{
    compute::evolution::{EaRng, FitnessFunction, TrialEvaluator, XorTask, random_genome},
    compute::markov::{MarkovNetwork, constant_input, decode_gates},
    schema::{EaConfig, GenomeTopology},
    EvolutionaryAlgorithm,
};

fn network_config(gates: usize, genome_len: usize) -> EaConfig {
    let mut config = EaConfig::default();
    config.representation.topology = GenomeTopology::Circular;
    config.representation.initial_size = genome_len;
    config.representation.max_size = genome_len.max(config.representation.max_size);
    config.markov.initial_gates = gates;
    config.markov.hidden = 16;
    config
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for gates in [4, 16, 64] {
        let config = network_config(gates, 5000);
        let mut rng = EaRng::seed_from_u64(1);
        let genome = random_genome(&config, &mut rng);

        group.bench_with_input(BenchmarkId::from_parameter(gates), &gates, |b, _| {
            b.iter(|| decode_gates(black_box(&genome), &config.markov, GenomeTopology::Circular));
        });
    }

    group.finish();
}

fn bench_network_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("network_update");

    for gates in [4, 16, 64] {
        let config = network_config(gates, 5000);
        let mut rng = EaRng::seed_from_u64(2);
        let genome = random_genome(&config, &mut rng);
        let mut network =
            MarkovNetwork::from_genome(&genome, &config.markov, GenomeTopology::Circular, 3);
        let inputs = [1u8, 0];

        group.bench_with_input(BenchmarkId::from_parameter(gates), &gates, |b, _| {
            b.iter(|| {
                network.clear();
                black_box(network.update_n(16, constant_input(&inputs)));
            });
        });
    }

    group.finish();
}

fn bench_xor_evaluation(c: &mut Criterion) {
    let config = network_config(16, 5000);
    let fitness = TrialEvaluator::new(
        XorTask,
        config.markov.clone(),
        GenomeTopology::Circular,
        config.markov.trials,
    );
    let mut rng = EaRng::seed_from_u64(4);
    let genome = random_genome(&config, &mut rng);

    c.bench_function("xor_evaluation", |b| {
        b.iter(|| fitness.evaluate(black_box(&genome), &mut rng));
    });
}

fn bench_ea_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("ea_update");
    group.sample_size(10);

    for size in [50, 200] {
        let mut config = network_config(8, 2000);
        config.population.size = size;
        config.random_seed = Some(5);
        let fitness = TrialEvaluator::new(
            XorTask,
            config.markov.clone(),
            GenomeTopology::Circular,
            config.markov.trials,
        );

        let Ok(mut ea) = EvolutionaryAlgorithm::new(config, Arc::new(fitness)) else {
            continue;
        };
        ea.initialize();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(ea.step()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decode,
    bench_network_update,
    bench_xor_evaluation,
    bench_ea_update
);
criterion_main!(benches);
