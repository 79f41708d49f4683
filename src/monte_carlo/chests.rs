//! Reward-draw batches: run every actor's journey, then reduce the traces.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, info_span};

use crate::error::RunError;
use crate::monte_carlo::run_actors;
use crate::parallel::WorkerPool;
use crate::scenario::ChestScenario;
use crate::sim::{entropy_seed, simulate_journey, ActorJourney, RewardTier, TierId, TierTable};
use crate::stats::{
    apply_normal_overlay, build_dense_histogram, nearest_match, or_better_table,
    percentile_threshold, sorted_ascending, Bucket, DrawMoments, OrBetterRow, TierOdds,
};

/// Mean across actors at one chest index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageStep {
    pub index: u32,
    pub mean_running_average: f64,
    /// Mean cumulative count per tier, indexed by [TierId].
    pub mean_counts: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChestPercentileSnapshot {
    pub percentile: u8,
    pub threshold_value: f64,
    /// Actor whose final average lies nearest the threshold.
    pub actor_index: usize,
    pub journey: ActorJourney,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierComparison {
    pub tier: TierId,
    pub name: String,
    pub value: f64,
    pub expected_percent: f64,
    pub actual_percent: f64,
    pub expected_per_actor: f64,
    pub actual_per_actor: f64,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrBetterComparison {
    pub theoretical: Vec<OrBetterRow>,
    pub empirical: Vec<OrBetterRow>,
}

/// Normal approximation of the final-average distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalOverlay {
    pub single_draw: DrawMoments,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChestReport {
    pub seed: u64,
    pub chests_per_actor: u32,
    pub num_actors: u32,
    pub container_price: f64,
    pub tiers: Vec<RewardTier>,
    pub all_journeys: Vec<ActorJourney>,
    pub average_journey: Vec<AverageStep>,
    /// Ascending.
    pub final_averages: Vec<f64>,
    pub percentile_snapshots: Vec<ChestPercentileSnapshot>,
    pub per_tier_expected_vs_actual: Vec<TierComparison>,
    pub or_better_cost_table: OrBetterComparison,
    pub histogram: Vec<Bucket>,
    pub normal_overlay: NormalOverlay,
}

/// Validates `scenario`, runs every actor and reduces the journeys into a report.
pub fn run_chest_batch(scenario: &ChestScenario, pool: &WorkerPool) -> Result<ChestReport, RunError> {
    let table = scenario.validate()?;
    let seed = scenario.seed.unwrap_or_else(entropy_seed);
    let actors = scenario.num_actors as usize;

    let span = info_span!(
        "chest_batch",
        actors,
        chests = scenario.chests_per_actor,
        seed,
        workers = pool.effective_workers()
    );
    let _entered = span.enter();
    let started = Instant::now();

    let chests = scenario.chests_per_actor;
    let journeys = run_actors(actors, seed, pool, |rng| {
        simulate_journey(&table, chests, rng)
    })?;
    let report = summarize(scenario, &table, seed, journeys);

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        median = report.final_averages.get(actors / 2).copied().unwrap_or_default(),
        "chest batch complete"
    );
    Ok(report)
}

fn summarize(
    scenario: &ChestScenario,
    table: &TierTable,
    seed: u64,
    journeys: Vec<ActorJourney>,
) -> ChestReport {
    let chests = scenario.chests_per_actor;
    let final_averages = sorted_ascending(journeys.iter().map(|journey| journey.final_average));

    let percentile_snapshots = scenario
        .percentiles
        .iter()
        .filter_map(|&percentile| {
            let threshold_value = percentile_threshold(&final_averages, f64::from(percentile))?;
            let actor_index =
                nearest_match(&journeys, threshold_value, |journey| journey.final_average)?;
            Some(ChestPercentileSnapshot {
                percentile,
                threshold_value,
                actor_index,
                journey: journeys[actor_index].clone(),
            })
        })
        .collect();

    let totals = tier_totals(table, &journeys);
    let draws: u64 = totals.iter().sum();

    let theoretical_odds: Vec<TierOdds> = table
        .tiers()
        .iter()
        .enumerate()
        .map(|(tier, reward)| TierOdds {
            tier,
            value: reward.value,
            probability: reward.probability,
        })
        .collect();
    let empirical_odds: Vec<TierOdds> = theoretical_odds
        .iter()
        .map(|odds| TierOdds {
            probability: share(totals[odds.tier], draws),
            ..*odds
        })
        .collect();

    let moments = DrawMoments::of(
        table
            .tiers()
            .iter()
            .map(|tier| (tier.value, tier.probability))
            .collect::<Vec<_>>(),
    );
    let normal_overlay = NormalOverlay {
        single_draw: moments,
        mean: moments.mean,
        std_dev: moments.std_dev_of_mean(u64::from(chests)),
    };
    let mut histogram = build_dense_histogram(&final_averages, scenario.bucket_width);
    apply_normal_overlay(
        &mut histogram,
        normal_overlay.mean,
        normal_overlay.std_dev,
        journeys.len() as u64,
    );

    let per_tier_expected_vs_actual = table
        .tiers()
        .iter()
        .enumerate()
        .map(|(tier, reward)| TierComparison {
            tier,
            name: reward.name.clone(),
            value: reward.value,
            expected_percent: reward.probability * 100.0,
            actual_percent: share(totals[tier], draws) * 100.0,
            expected_per_actor: reward.probability * f64::from(chests),
            actual_per_actor: share(totals[tier], journeys.len() as u64),
            total_count: totals[tier],
        })
        .collect();

    ChestReport {
        seed,
        chests_per_actor: chests,
        num_actors: scenario.num_actors,
        container_price: scenario.container_price,
        tiers: table.tiers().to_vec(),
        average_journey: average_journey(table, chests, &journeys),
        final_averages,
        percentile_snapshots,
        per_tier_expected_vs_actual,
        or_better_cost_table: OrBetterComparison {
            theoretical: or_better_table(&theoretical_odds, scenario.container_price),
            empirical: or_better_table(&empirical_odds, scenario.container_price),
        },
        histogram,
        normal_overlay,
        all_journeys: journeys,
    }
}

fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn tier_totals(table: &TierTable, journeys: &[ActorJourney]) -> Vec<u64> {
    let mut totals = vec![0_u64; table.len()];
    for journey in journeys {
        for (total, &count) in totals.iter_mut().zip(&journey.final_counts) {
            *total += u64::from(count);
        }
    }
    totals
}

fn average_journey(table: &TierTable, chests: u32, journeys: &[ActorJourney]) -> Vec<AverageStep> {
    let actors = journeys.len().max(1) as f64;
    (0..chests as usize)
        .map(|step| {
            let mut running_sum = 0.0;
            let mut count_sums = vec![0.0; table.len()];
            for journey in journeys {
                let Some(draw) = journey.steps.get(step) else {
                    continue;
                };
                running_sum += draw.running_average;
                for (sum, &count) in count_sums.iter_mut().zip(&draw.cumulative_counts) {
                    *sum += f64::from(count);
                }
            }
            AverageStep {
                index: step as u32 + 1,
                mean_running_average: running_sum / actors,
                mean_counts: count_sums.into_iter().map(|sum| sum / actors).collect(),
            }
        })
        .collect()
}
