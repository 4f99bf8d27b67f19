//! Island model: many populations evolving side by side.
//!
//! Islands advance one update in parallel, then exchange individuals
//! sequentially according to the meta model (migration or QHFC tiers).

mod meta_population;
mod migration;
mod qhfc;

pub use meta_population::{MetaCheckpoint, MetaPopulation, MetaUpdateEvent, combined_stats};
pub use migration::migrate;
pub use qhfc::{QhfcState, demote, refill};

use crate::compute::evolution::{EvolutionaryAlgorithm, Population};

/// Lend every island's population to `f` at once, then put them back.
pub(crate) fn exchange<R>(
    islands: &mut [EvolutionaryAlgorithm],
    f: impl FnOnce(&mut [Population]) -> R,
) -> R {
    let mut populations: Vec<Population> = islands
        .iter_mut()
        .map(|island| std::mem::take(island.population_mut()))
        .collect();
    let result = f(&mut populations);
    for (island, population) in islands.iter_mut().zip(populations) {
        *island.population_mut() = population;
    }
    result
}
