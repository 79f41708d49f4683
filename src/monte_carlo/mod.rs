//! Batch runners: many independent actors per run, reduced to reports.

pub mod chests;
pub mod upgrade;

use rayon::prelude::*;
use tracing::debug;

use crate::parallel::{actor_batches, PoolError, Progress, WorkerPool};
use crate::sim::Rng;

pub use chests::{
    run_chest_batch, AverageStep, ChestPercentileSnapshot, ChestReport, NormalOverlay,
    OrBetterComparison, TierComparison,
};
pub use upgrade::{run_upgrade_batch, UpgradePercentileSnapshot, UpgradeReport, UpgradeSummary};

/// Runs `run_one` once per actor on `pool`, each actor with its own stream derived from `seed`.
/// Results come back in actor order regardless of how batches were scheduled.
pub(crate) fn run_actors<T, F>(
    actors: usize,
    seed: u64,
    pool: &WorkerPool,
    run_one: F,
) -> Result<Vec<T>, PoolError>
where
    T: Send,
    F: Fn(&mut Rng) -> T + Sync,
{
    let progress = Progress::new(actors);
    let batches = actor_batches(actors, pool.effective_workers());

    let per_batch: Vec<Vec<T>> = pool.install(|| {
        batches
            .par_iter()
            .map(|&(start, end)| {
                let results: Vec<T> = (start..end)
                    .map(|actor| run_one(&mut Rng::for_stream(seed, actor as u64)))
                    .collect();
                let completed = progress.record(end - start);
                debug!(
                    completed,
                    total = progress.total(),
                    fraction = progress.fraction(),
                    "actor batch finished"
                );
                results
            })
            .collect()
    })?;

    Ok(per_batch.into_iter().flatten().collect())
}
