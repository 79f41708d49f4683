//! Batch distribution for parallel simulation.
//!
//! Splits the actors of a run into contiguous ranges. Each range runs as one parallel task and
//! reports to the run's [crate::parallel::Progress] when it finishes.

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
///
/// # Example
/// ```
/// # use reliquary::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + if i < remainder { 1 } else { 0 };
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Batches per worker thread.
pub const BATCHES_PER_WORKER: usize = 4;

/// Actor ranges for a run on `workers` threads.
pub fn actor_batches(actors: usize, workers: usize) -> Vec<(usize, usize)> {
    batch_ranges(actors, workers.max(1) * BATCHES_PER_WORKER)
}
