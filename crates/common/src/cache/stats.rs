//! Memoization statistics
//!
//! Counters are plain atomics so lookups never take an extra lock to record
//! a hit or miss.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a memoized function's counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoStats {
    /// Entries currently stored
    pub size: usize,
    /// Calls answered from the cache
    pub hits: u64,
    /// Calls that had to compute (absent or expired key)
    pub misses: u64,
    /// Successful computations
    pub computations: u64,
    /// Computations that returned an error and were not cached
    pub failures: u64,
    /// Stale entries found on lookup and replaced
    pub expirations: u64,
}

impl MemoStats {
    /// hits / (hits + misses)
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_calls();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// hits + misses
    pub fn total_calls(&self) -> u64 {
        self.hits + self.misses
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    failures: AtomicU64,
    expirations: AtomicU64,
}

impl StatsCollector {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_computation(&self) {
        self.computations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, size: usize) -> MemoStats {
        MemoStats {
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.computations.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        let stats = MemoStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.total_calls(), 0);
    }

    #[test]
    fn test_collector_snapshot_and_reset() {
        let collector = StatsCollector::default();
        collector.record_hit();
        collector.record_hit();
        collector.record_hit();
        collector.record_miss();
        collector.record_computation();
        collector.record_failure();
        collector.record_expiration();

        let stats = collector.snapshot(4);
        assert_eq!(stats.size, 4);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.expirations, 1);
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);

        collector.reset();
        assert_eq!(collector.snapshot(0), MemoStats::default());
    }
}
