//! "Or-better" probabilities and effective acquisition cost.
//!
//! One function serves both the configured (theoretical) and the observed (empirical) odds so the
//! two tables line up row for row.


use serde::Serialize;

use crate::stats::Estimate;

/// Below this or-better probability the cost is reported as unbounded.
pub const MIN_OR_BETTER_PROBABILITY: f64 = 1e-4;

/// Value and probability of one tier, keyed by its position in the tier list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierOdds {
    pub tier: usize,
    pub value: f64,
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrBetterRow {
    pub tier: usize,
    /// Position after ordering by value descending.
    pub rank: usize,
    pub probability: f64,
    pub or_better_probability: f64,
    pub effective_cost: Estimate<f64>,
}

/// Rows in descending-value order (ties: higher probability first, then tier order).
pub fn or_better_table(odds: &[TierOdds], container_price: f64) -> Vec<OrBetterRow> {
    let mut ordered = odds.to_vec();
    ordered.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| b.probability.total_cmp(&a.probability))
            .then_with(|| a.tier.cmp(&b.tier))
    });

    let mut cumulative = 0.0;
    ordered
        .into_iter()
        .enumerate()
        .map(|(rank, entry)| {
            cumulative += entry.probability;
            OrBetterRow {
                tier: entry.tier,
                rank,
                probability: entry.probability,
                or_better_probability: cumulative,
                effective_cost: effective_cost(container_price, cumulative),
            }
        })
        .collect()
}

pub fn effective_cost(container_price: f64, or_better_probability: f64) -> Estimate<f64> {
    if or_better_probability < MIN_OR_BETTER_PROBABILITY {
        Estimate::Unbounded
    } else {
        Estimate::Finite(container_price / or_better_probability)
    }
}

/// Looks up a tier's row in a table built by [or_better_table].
pub fn row_for_tier(rows: &[OrBetterRow], tier: usize) -> Option<&OrBetterRow> {
    rows.iter().find(|row| row.tier == tier)
}
