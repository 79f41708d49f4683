//! Theoretical overlays on empirical histograms.

use serde::Serialize;

use crate::stats::geometric;
use crate::stats::histogram::{AttemptBin, Bucket};
use crate::stats::normal::normal_cdf_at;

/// Mean and variance of one draw from a discrete `(value, probability)` distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawMoments {
    pub mean: f64,
    pub variance: f64,
}

impl DrawMoments {
    pub fn of(outcomes: impl IntoIterator<Item = (f64, f64)> + Clone) -> Self {
        let mean: f64 = outcomes
            .clone()
            .into_iter()
            .map(|(value, probability)| value * probability)
            .sum();
        let variance = outcomes
            .into_iter()
            .map(|(value, probability)| (value - mean).powi(2) * probability)
            .sum();
        Self { mean, variance }
    }

    /// Spread of the mean of `draws` independent draws.
    pub fn std_dev_of_mean(&self, draws: u64) -> f64 {
        if draws == 0 {
            return 0.0;
        }
        (self.variance / draws as f64).sqrt()
    }
}

/// Expected number of actors per bucket when their averages follow `N(mean, sd²)`.
pub fn apply_normal_overlay(buckets: &mut [Bucket], mean: f64, sd: f64, actors: u64) {
    let total = actors as f64;
    for bucket in buckets {
        let mass = normal_cdf_at(bucket.high, mean, sd) - normal_cdf_at(bucket.low, mean, sd);
        bucket.expected = Some(mass.max(0.0) * total);
    }
}

/// Expected number of actors per attempt bin for a geometric law with success probability `p`.
/// Actors stop at `cap`, so the bin holding `cap` takes the whole tail from its start.
pub fn apply_geometric_overlay(bins: &mut [AttemptBin], p: f64, cap: u64, actors: u64) {
    let total = actors as f64;
    for bin in bins {
        let below = geometric::cumulative(p, bin.start.saturating_sub(1));
        let through = if bin.end >= cap {
            1.0
        } else {
            geometric::cumulative(p, bin.end)
        };
        bin.expected = Some((through - below).max(0.0) * total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::histogram::{bin_attempts, build_dense_histogram};

    #[test]
    fn moments_of_two_point_distribution() {
        let moments = DrawMoments::of([(0.0, 0.5), (10.0, 0.5)]);
        assert!((moments.mean - 5.0).abs() < 1e-12);
        assert!((moments.variance - 25.0).abs() < 1e-12);
        assert!((moments.std_dev_of_mean(25) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normal_overlay_mass_sums_to_near_total_over_wide_range() {
        let values: Vec<f64> = (0..=80).map(|i| 20.0 + i as f64 * 0.125).collect();
        let mut buckets = build_dense_histogram(&values, 0.5);
        apply_normal_overlay(&mut buckets, 25.0, 1.0, 1000);
        let expected: f64 = buckets.iter().filter_map(|b| b.expected).sum();
        assert!((expected - 1000.0).abs() < 0.1, "expected={expected}");
    }

    #[test]
    fn geometric_overlay_absorbs_tail_into_cap_bin() {
        let mut bins = bin_attempts(&[1, 2, 3, 4, 5]);
        apply_geometric_overlay(&mut bins, 0.2, 5, 100);
        let expected: f64 = bins.iter().filter_map(|b| b.expected).sum();
        assert!((expected - 100.0).abs() < 1e-9, "expected={expected}");
        assert!((bins[0].expected.unwrap() - 20.0).abs() < 1e-9);
    }
}
