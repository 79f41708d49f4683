//! Closed-form attempt model for the upgrade engine: each attempt succeeds independently with
//! probability `p`, so attempts-to-first-success are geometric.

use serde::Serialize;

use crate::stats::Estimate;

/// Probabilities below this are treated as zero.
pub const DEGENERATE_PROBABILITY: f64 = 1e-9;

/// Longest geometric series emitted for display.
pub const MAX_SERIES_POINTS: u64 = 1000;

/// Product of per-level effective rates, each capped to `[0, 1]`.
pub fn chained_success_probability(rates: impl IntoIterator<Item = f64>) -> f64 {
    rates
        .into_iter()
        .map(|rate| rate.clamp(0.0, 1.0))
        .product()
}

/// Mean attempts to first success, `1 / p`.
pub fn expected_attempts(p: f64) -> Estimate<f64> {
    if p < DEGENERATE_PROBABILITY {
        Estimate::Unbounded
    } else {
        Estimate::Finite(1.0 / p)
    }
}

/// Smallest `k` with `1 - (1 - p)^k >= confidence`, where `confidence` is in `(0, 1)`.
pub fn attempts_for_confidence(p: f64, confidence: f64) -> Estimate<u64> {
    if p < DEGENERATE_PROBABILITY {
        return Estimate::Unbounded;
    }
    if p >= 1.0 {
        return Estimate::Finite(1);
    }
    let denominator = (1.0 - p).ln();
    if denominator.abs() < DEGENERATE_PROBABILITY {
        return Estimate::Unbounded;
    }
    let k = ((1.0 - confidence).ln() / denominator).ceil();
    Estimate::Finite(k.max(1.0) as u64)
}

/// `P(X <= k)`.
pub fn cumulative(p: f64, k: u64) -> f64 {
    if k == 0 {
        return 0.0;
    }
    1.0 - (1.0 - p.clamp(0.0, 1.0)).powf(k as f64)
}

/// `P(X = k)` for `k >= 1`.
pub fn pmf(p: f64, k: u64) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    p * (1.0 - p).powf((k - 1) as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeometricPoint {
    pub attempt: u64,
    pub probability: f64,
    pub cumulative_probability: f64,
}

/// Points `1..=through`, capped at [MAX_SERIES_POINTS]. Empty when `p` is degenerate.
pub fn geometric_series(p: f64, through: Estimate<u64>) -> Vec<GeometricPoint> {
    if p < DEGENERATE_PROBABILITY {
        return Vec::new();
    }
    let last = through
        .finite()
        .unwrap_or(MAX_SERIES_POINTS)
        .min(MAX_SERIES_POINTS);
    let mut running = 0.0;
    (1..=last)
        .map(|attempt| {
            let probability = pmf(p, attempt);
            running += probability;
            GeometricPoint {
                attempt,
                probability,
                cumulative_probability: running,
            }
        })
        .collect()
}
