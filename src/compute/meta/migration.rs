//! Migration between island populations.

use log::debug;
use rand::seq::{SliceRandom, index};

use crate::compute::evolution::{EaRng, Individual, Population, ranked_indices};
use crate::schema::{EmigrantSelection, MigrationConfig, MigrationMode, MigrationTopology};

/// Exchange individuals along the configured topology.
///
/// All emigrants are chosen before any island receives immigrants, and every
/// island receives at most as many individuals as it gives up, so island
/// sizes never change. Returns the number of individuals delivered.
pub fn migrate(populations: &mut [Population], config: &MigrationConfig, rng: &mut EaRng) -> usize {
    let k = populations.len();
    if k < 2 {
        return 0;
    }

    let mut order: Vec<usize> = (0..k).collect();
    if config.topology == MigrationTopology::RandomRing {
        order.shuffle(rng);
    }

    let mut outgoing: Vec<Vec<Individual>> = Vec::with_capacity(k);
    let mut slots: Vec<Vec<usize>> = Vec::with_capacity(k);
    for population in populations.iter() {
        let len = population.len();
        let n = config.migrants(len).min(len);

        let chosen: Vec<usize> = match config.emigrants {
            EmigrantSelection::Random => index::sample(rng, len, n).into_vec(),
            EmigrantSelection::Best => ranked_indices(population).into_iter().take(n).collect(),
        };
        outgoing.push(chosen.iter().map(|&i| population[i].clone()).collect());
        slots.push(match config.mode {
            MigrationMode::Move => chosen,
            MigrationMode::Copy => index::sample(rng, len, n).into_vec(),
        });
    }

    let mut delivered = 0;
    for j in 0..k {
        let from = order[j];
        let to = order[(j + 1) % k];
        let immigrants = std::mem::take(&mut outgoing[from]);
        for (&slot, individual) in slots[to].iter().zip(immigrants) {
            populations[to][slot] = individual;
            delivered += 1;
        }
    }

    debug!("migration delivered {delivered} individuals across {k} islands");
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::{Fitness, Genome};
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn islands(count: usize, size: usize) -> Vec<Population> {
        (0..count)
            .map(|island| {
                (0..size)
                    .map(|i| Individual {
                        fitness: Some(Fitness::Unary(i as f64)),
                        ..Individual::new((island * 1000 + i) as u64, Genome::new(vec![island as u32]), 0)
                    })
                    .collect()
            })
            .collect()
    }

    fn config(mode: MigrationMode, emigrants: EmigrantSelection) -> MigrationConfig {
        MigrationConfig {
            rate: 0.2,
            mode,
            emigrants,
            ..Default::default()
        }
    }

    #[test]
    fn test_ring_move_best() {
        let mut pops = islands(3, 10);
        let mut rng = EaRng::seed_from_u64(0);
        let delivered = migrate(
            &mut pops,
            &config(MigrationMode::Move, EmigrantSelection::Best),
            &mut rng,
        );
        assert_eq!(delivered, 6);

        // Island 1 received island 0's two best in place of its own two best.
        let from_zero: Vec<u64> = pops[1]
            .iter()
            .filter(|i| i.genome.codons() == [0])
            .map(|i| i.id)
            .collect();
        assert_eq!(from_zero.len(), 2);
        assert!(from_zero.contains(&9) && from_zero.contains(&8));
        assert!(!pops[1].iter().any(|i| i.id == 1009));
        // Island 0 received from the last island.
        assert_eq!(pops[0].iter().filter(|i| i.genome.codons() == [2]).count(), 2);
    }

    #[test]
    fn test_move_conserves_every_individual() {
        let mut pops = islands(4, 10);
        let mut rng = EaRng::seed_from_u64(1);
        migrate(
            &mut pops,
            &config(MigrationMode::Move, EmigrantSelection::Random),
            &mut rng,
        );
        let mut ids: Vec<u64> = pops.iter().flatten().map(|i| i.id).collect();
        ids.sort_unstable();
        let mut expected: Vec<u64> = islands(4, 10).iter().flatten().map(|i| i.id).collect();
        expected.sort_unstable();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_copy_keeps_emigrants() {
        let mut pops = islands(2, 10);
        let mut rng = EaRng::seed_from_u64(2);
        migrate(
            &mut pops,
            &config(MigrationMode::Copy, EmigrantSelection::Best),
            &mut rng,
        );
        let ids = |p: &Population| p.iter().map(|i| i.id).collect::<Vec<_>>();
        // Emigrants are copied abroad and the receiving slots are overwritten.
        assert!(ids(&pops[1]).contains(&9) && ids(&pops[1]).contains(&8));
        assert!(ids(&pops[0]).contains(&1009) && ids(&pops[0]).contains(&1008));
        assert_eq!(pops[0].len() + pops[1].len(), 20);
    }

    #[test]
    fn test_single_island_is_noop() {
        let mut pops = islands(1, 5);
        let mut rng = EaRng::seed_from_u64(3);
        let before = pops.clone();
        assert_eq!(
            migrate(&mut pops, &MigrationConfig::default(), &mut rng),
            0
        );
        assert_eq!(pops, before);
    }

    proptest! {
        #[test]
        fn prop_migration_conserves_counts(
            count in 2usize..6,
            size in 1usize..20,
            rate in 0.0f64..1.0,
            random_ring in any::<bool>(),
            copy in any::<bool>(),
            best in any::<bool>(),
            seed in any::<u64>(),
        ) {
            let config = MigrationConfig {
                period: 1,
                rate,
                topology: if random_ring { MigrationTopology::RandomRing } else { MigrationTopology::Ring },
                emigrants: if best { EmigrantSelection::Best } else { EmigrantSelection::Random },
                mode: if copy { MigrationMode::Copy } else { MigrationMode::Move },
            };
            let mut pops = islands(count, size);
            let mut rng = EaRng::seed_from_u64(seed);
            migrate(&mut pops, &config, &mut rng);
            prop_assert!(pops.iter().all(|p| p.len() == size));
            prop_assert_eq!(pops.iter().map(Vec::len).sum::<usize>(), count * size);
        }
    }
}
