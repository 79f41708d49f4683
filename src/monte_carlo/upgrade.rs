//! Sequential-upgrade batches with the closed-form geometric comparison.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::error::RunError;
use crate::monte_carlo::run_actors;
use crate::parallel::WorkerPool;
use crate::scenario::{LevelTableRow, UpgradeScenario};
use crate::sim::{entropy_seed, simulate_upgrade, UpgradeAttemptResult, UpgradeLevel};
use crate::stats::{
    apply_geometric_overlay, attempts_for_confidence, bin_attempts, chained_success_probability,
    expected_attempts, geometric_series, nearest_match, percentile_threshold, AttemptBin, Estimate,
    GeometricPoint,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradePercentileSnapshot {
    pub percentile: u8,
    pub threshold_value: u32,
    pub actor_index: usize,
    pub attempts_until_success: u32,
    pub succeeded: bool,
    pub total_rolls: u64,
    pub levels_gained: u32,
    pub levels_per_roll: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UpgradeSummary {
    pub mean_attempts: f64,
    pub mean_rolls: f64,
    /// Fraction of actors that reached the target.
    pub success_rate: f64,
    pub capped_actors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeReport {
    pub seed: u64,
    pub start_level: u32,
    pub target_level: u32,
    /// Fraction actually used, after clamping.
    pub confidence: f64,
    pub confidence_clamped: bool,
    pub num_actors: u32,
    pub max_attempts: u32,
    pub level_table: Vec<LevelTableRow>,
    pub path: Vec<UpgradeLevel>,
    pub theoretical_success_probability: f64,
    pub expected_attempts: Estimate<f64>,
    pub confidence_attempts: Estimate<u64>,
    pub geometric_distribution: Vec<GeometricPoint>,
    pub simulated_attempts_per_actor: Vec<UpgradeAttemptResult>,
    pub simulated_vs_expected_histogram: Vec<AttemptBin>,
    pub percentile_snapshots: Vec<UpgradePercentileSnapshot>,
    pub summary: UpgradeSummary,
}

pub fn run_upgrade_batch(
    scenario: &UpgradeScenario,
    pool: &WorkerPool,
) -> Result<UpgradeReport, RunError> {
    let path = scenario.validate()?;
    let (confidence, confidence_clamped) = scenario.clamped_confidence();
    if confidence_clamped {
        warn!(
            requested = scenario.confidence_percent,
            used = confidence * 100.0,
            "confidence clamped into supported range"
        );
    }
    let seed = scenario.seed.unwrap_or_else(entropy_seed);
    let actors = scenario.num_actors as usize;

    let span = info_span!(
        "upgrade_batch",
        actors,
        start = path.start_level(),
        target = path.target_level(),
        seed,
        workers = pool.effective_workers()
    );
    let _entered = span.enter();
    let started = Instant::now();

    let max_attempts = scenario.max_attempts;
    let results = run_actors(actors, seed, pool, |rng| {
        simulate_upgrade(&path, max_attempts, rng)
    })?;

    let p = chained_success_probability(path.effective_rates());
    let confidence_attempts = attempts_for_confidence(p, confidence);
    let attempts: Vec<u64> = results
        .iter()
        .map(|result| u64::from(result.attempts_until_success))
        .collect();
    let mut histogram = bin_attempts(&attempts);
    apply_geometric_overlay(&mut histogram, p, u64::from(max_attempts), actors as u64);

    let summary = summarize(&results);
    if summary.capped_actors > 0 {
        warn!(
            capped = summary.capped_actors,
            max_attempts, "actors stopped at the attempt cap without reaching the target"
        );
    }

    let report = UpgradeReport {
        seed,
        start_level: path.start_level(),
        target_level: path.target_level(),
        confidence,
        confidence_clamped,
        num_actors: scenario.num_actors,
        max_attempts,
        level_table: scenario.level_table(),
        path: path.steps().to_vec(),
        theoretical_success_probability: p,
        expected_attempts: expected_attempts(p),
        confidence_attempts,
        geometric_distribution: geometric_series(p, confidence_attempts),
        percentile_snapshots: snapshots(&scenario.percentiles, &results, path.levels_to_gain()),
        simulated_vs_expected_histogram: histogram,
        simulated_attempts_per_actor: results,
        summary,
    };

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        p,
        mean_attempts = summary.mean_attempts,
        "upgrade batch complete"
    );
    Ok(report)
}

fn snapshots(
    percentiles: &[u8],
    results: &[UpgradeAttemptResult],
    levels_gained: u32,
) -> Vec<UpgradePercentileSnapshot> {
    let mut sorted: Vec<u32> = results
        .iter()
        .map(|result| result.attempts_until_success)
        .collect();
    sorted.sort_unstable();

    percentiles
        .iter()
        .filter_map(|&percentile| {
            let threshold_value = percentile_threshold(&sorted, f64::from(percentile))?;
            let actor_index = nearest_match(results, f64::from(threshold_value), |result| {
                f64::from(result.attempts_until_success)
            })?;
            let representative = results[actor_index];
            Some(UpgradePercentileSnapshot {
                percentile,
                threshold_value,
                actor_index,
                attempts_until_success: representative.attempts_until_success,
                succeeded: representative.succeeded,
                total_rolls: representative.total_rolls,
                levels_gained,
                levels_per_roll: if representative.total_rolls == 0 {
                    0.0
                } else {
                    f64::from(levels_gained) / representative.total_rolls as f64
                },
            })
        })
        .collect()
}

fn summarize(results: &[UpgradeAttemptResult]) -> UpgradeSummary {
    let n = results.len().max(1) as f64;
    let attempts: u64 = results
        .iter()
        .map(|result| u64::from(result.attempts_until_success))
        .sum();
    let rolls: u64 = results.iter().map(|result| result.total_rolls).sum();
    let succeeded = results.iter().filter(|result| result.succeeded).count();
    UpgradeSummary {
        mean_attempts: attempts as f64 / n,
        mean_rolls: rolls as f64 / n,
        success_rate: succeeded as f64 / n,
        capped_actors: results.len() - succeeded,
    }
}
