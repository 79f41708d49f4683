use std::sync::atomic::{AtomicUsize, Ordering};

/// Completed-actor counter shared by the worker batches of one run.
#[derive(Debug)]
pub struct Progress {
    total: usize,
    completed: AtomicUsize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Adds `count` finished actors and returns the new total.
    pub fn record(&self, count: usize) -> usize {
        self.completed.fetch_add(count, Ordering::Relaxed) + count
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed() as f64 / self.total as f64
    }
}
