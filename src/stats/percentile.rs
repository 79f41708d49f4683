//! Percentile thresholds and nearest-match representative selection.
//!
//! The representative for a percentile is the trial whose own metric lies closest to the
//! threshold, not an interpolated value, so callers always get a concrete trajectory to show.
//! For small batches the representative can sit noticeably away from the threshold; that is
//! accepted.

/// Index into a sorted sequence of length `len` for percentile `p` (0..=100):
/// `floor(p / 100 * len)`, clamped to the last element. `None` when `len == 0`.
pub fn percentile_index(len: usize, percentile: f64) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let raw = (percentile.clamp(0.0, 100.0) / 100.0 * len as f64).floor() as usize;
    Some(raw.min(len - 1))
}

/// Threshold value of `percentile` over an ascending-sorted slice.
pub fn percentile_threshold<T: Copy>(sorted: &[T], percentile: f64) -> Option<T> {
    percentile_index(sorted.len(), percentile).map(|idx| sorted[idx])
}

/// Position of the trial whose metric is nearest `target`. Ties resolve to the earliest trial.
pub fn nearest_match<T>(trials: &[T], target: f64, metric: impl Fn(&T) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, trial) in trials.iter().enumerate() {
        let diff = (metric(trial) - target).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((index, diff)),
        }
    }
    best.map(|(index, _)| index)
}

/// Ascending copy of `values` using a total order (NaN sorts last).
pub fn sorted_ascending(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.into_iter().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_follows_floor_rule_and_clamps() {
        assert_eq!(percentile_index(10, 5.0), Some(0));
        assert_eq!(percentile_index(10, 50.0), Some(5));
        assert_eq!(percentile_index(10, 95.0), Some(9));
        assert_eq!(percentile_index(10, 100.0), Some(9));
        assert_eq!(percentile_index(0, 50.0), None);
    }

    #[test]
    fn thresholds_are_non_decreasing() {
        let sorted = sorted_ascending([3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0]);
        let mut previous = f64::NEG_INFINITY;
        for p in 1..=99 {
            let value = percentile_threshold(&sorted, p as f64).unwrap();
            assert!(value >= previous, "p={p} value={value} previous={previous}");
            previous = value;
        }
    }

    #[test]
    fn nearest_match_prefers_first_on_ties() {
        let trials = [10.0, 12.0, 8.0, 12.0];
        assert_eq!(nearest_match(&trials, 11.0, |v| *v), Some(0));
        assert_eq!(nearest_match(&trials, 12.0, |v| *v), Some(1));
        assert_eq!(nearest_match(&trials, 7.0, |v| *v), Some(2));
        assert_eq!(nearest_match::<f64>(&[], 1.0, |v| *v), None);
    }
}
