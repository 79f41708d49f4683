//! Histogram builders: fixed-width buckets for continuous outcomes and equal-width integer bins
//! for attempt counts.

use std::collections::BTreeMap;

use serde::Serialize;

/// Upper bound on the number of bins used for attempt histograms.
pub const MAX_ATTEMPT_BINS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub low: f64,
    pub high: f64,
    /// `[low, high)`.
    pub label: String,
    pub count: u64,
    /// Theoretical count for the same range, filled by an overlay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<f64>,
}

fn bucket_key(value: f64, width: f64) -> i64 {
    (value / width).floor() as i64
}

fn label_decimals(width: f64) -> usize {
    (1..=6)
        .find(|&decimals| {
            let scaled = width * 10_f64.powi(decimals as i32);
            (scaled - scaled.round()).abs() < 1e-9
        })
        .unwrap_or(6)
}

fn make_bucket(key: i64, width: f64, count: u64, decimals: usize) -> Bucket {
    let low = key as f64 * width;
    let high = low + width;
    Bucket {
        low,
        high,
        label: format!("[{low:.decimals$}, {high:.decimals$})"),
        count,
        expected: None,
    }
}

fn count_by_key(values: &[f64], width: f64) -> BTreeMap<i64, u64> {
    let mut counts = BTreeMap::new();
    for &value in values.iter().filter(|v| v.is_finite()) {
        *counts.entry(bucket_key(value, width)).or_insert(0) += 1;
    }
    counts
}

/// Occupied buckets only, ascending. `width` must be positive.
pub fn build_histogram(values: &[f64], width: f64) -> Vec<Bucket> {
    let decimals = label_decimals(width);
    count_by_key(values, width)
        .into_iter()
        .map(|(key, count)| make_bucket(key, width, count, decimals))
        .collect()
}

/// Every bucket from the lowest to the highest occupied one, including empty buckets, so an
/// overlay can be drawn over a continuous x-axis.
pub fn build_dense_histogram(values: &[f64], width: f64) -> Vec<Bucket> {
    let decimals = label_decimals(width);
    let counts = count_by_key(values, width);
    let (Some(&first), Some(&last)) = (counts.keys().next(), counts.keys().next_back()) else {
        return Vec::new();
    };
    (first..=last)
        .map(|key| make_bucket(key, width, counts.get(&key).copied().unwrap_or(0), decimals))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptBin {
    /// Inclusive.
    pub start: u64,
    /// Inclusive.
    pub end: u64,
    pub label: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<f64>,
}

/// Equal-width integer bins spanning `[min, max]` of `values`, at most [MAX_ATTEMPT_BINS].
/// A single bin when every value is equal.
pub fn bin_attempts(values: &[u64]) -> Vec<AttemptBin> {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };
    if min == max {
        return vec![AttemptBin {
            start: min,
            end: max,
            label: min.to_string(),
            count: values.len() as u64,
            expected: None,
        }];
    }

    let range = max - min + 1;
    let bin_size = range.div_ceil(MAX_ATTEMPT_BINS);
    let mut bins: Vec<AttemptBin> = (0..MAX_ATTEMPT_BINS)
        .map(|i| min + i * bin_size)
        .take_while(|&start| start <= max)
        .map(|start| {
            let end = start + bin_size - 1;
            AttemptBin {
                start,
                end,
                label: if start == end {
                    start.to_string()
                } else {
                    format!("{start}-{end}")
                },
                count: 0,
                expected: None,
            }
        })
        .collect();

    let last = bins.len() - 1;
    for &value in values {
        let index = (((value - min) / bin_size) as usize).min(last);
        bins[index].count += 1;
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_are_sorted_and_labelled() {
        let buckets = build_histogram(&[21.2, 20.1, 20.4, 25.0, 20.6], 0.5);
        let lows: Vec<f64> = buckets.iter().map(|b| b.low).collect();
        assert_eq!(lows, vec![20.0, 20.5, 21.0, 25.0]);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].label, "[20.0, 20.5)");
    }

    #[test]
    fn counts_are_preserved_for_any_width() {
        let values: Vec<f64> = (0..257).map(|i| (i as f64 * 0.37).sin() * 13.0 + 20.0).collect();
        for width in [0.05, 0.25, 0.5, 1.0, 3.3, 100.0] {
            let total: u64 = build_histogram(&values, width).iter().map(|b| b.count).sum();
            assert_eq!(total, values.len() as u64, "width={width}");
            let dense: u64 = build_dense_histogram(&values, width).iter().map(|b| b.count).sum();
            assert_eq!(dense, values.len() as u64, "width={width}");
        }
    }

    #[test]
    fn negative_values_floor_downwards() {
        let buckets = build_histogram(&[-0.1], 0.5);
        assert_eq!(buckets[0].low, -0.5);
    }

    #[test]
    fn dense_histogram_fills_gaps() {
        let buckets = build_dense_histogram(&[20.0, 22.0], 0.5);
        assert_eq!(buckets.len(), 5);
        assert_eq!(buckets.iter().filter(|b| b.count == 0).count(), 3);
    }

    #[test]
    fn label_precision_follows_width() {
        let buckets = build_histogram(&[20.3], 0.25);
        assert_eq!(buckets[0].label, "[20.25, 20.50)");
    }

    #[test]
    fn attempt_bins_cover_range() {
        let values: Vec<u64> = (1..=45).collect();
        let bins = bin_attempts(&values);
        assert_eq!(bins.len(), 15);
        assert_eq!(bins[0].start, 1);
        assert_eq!(bins[0].end, 3);
        assert_eq!(bins[0].label, "1-3");
        assert_eq!(bins.iter().map(|b| b.count).sum::<u64>(), 45);
    }

    #[test]
    fn identical_attempts_use_single_bin() {
        let bins = bin_attempts(&[4, 4, 4]);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].label, "4");
        assert_eq!(bins[0].count, 3);
    }
}
