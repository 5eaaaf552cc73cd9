//! Progress reporting for long-running operations.
//!
//! A [`ProgressTracker`] is a lock-free counter that workers bump as they
//! finish units of work. Observers poll it from another thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe progress counter.
#[derive(Debug)]
pub struct ProgressTracker {
    current: AtomicU64,
    total: AtomicU64,
}

impl ProgressTracker {
    /// Create a tracker expecting `total` units of work.
    pub fn new(total: u64) -> Self {
        Self {
            current: AtomicU64::new(0),
            total: AtomicU64::new(total),
        }
    }

    /// Mark one unit done.
    #[inline]
    pub fn increment(&self) {
        self.current.fetch_add(1, Ordering::Relaxed);
    }

    /// Grow the expected total, e.g. once the number of stages is known.
    #[inline]
    pub fn add_total(&self, amount: u64) {
        self.total.fetch_add(amount, Ordering::Relaxed);
    }

    /// Completed units.
    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Expected units.
    #[inline]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Progress as a fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.current().min(total) as f64) / (total as f64)
        }
    }
}

/// Progress tracker shared between threads.
pub type SharedProgressTracker = Arc<ProgressTracker>;

/// Create a shared progress tracker.
pub fn shared_tracker(total: u64) -> SharedProgressTracker {
    Arc::new(ProgressTracker::new(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_counts_across_threads() {
        let tracker = shared_tracker(100);
        std::thread::scope(|s| {
            for _ in 0..4 {
                let t = Arc::clone(&tracker);
                s.spawn(move || {
                    for _ in 0..25 {
                        t.increment();
                    }
                });
            }
        });
        assert_eq!(tracker.current(), 100);
        assert_eq!(tracker.fraction(), 1.0);
    }

    #[test]
    fn test_total_grows_with_announced_work() {
        let tracker = ProgressTracker::new(1);
        assert_eq!(tracker.fraction(), 0.0);
        tracker.add_total(3);
        tracker.increment();
        assert_eq!(tracker.total(), 4);
        assert_eq!(tracker.fraction(), 0.25);
        assert_eq!(ProgressTracker::new(0).fraction(), 0.0);
    }
}
