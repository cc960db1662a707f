//! Memoization for recursive functions
//!
//! A recursive step cannot name its own memoized wrapper before that wrapper
//! exists. [`RecursiveMemo`] breaks the cycle with an explicit fixed point:
//! the step receives the memoized function as its first argument and
//! recurses through it, so every sub-result lands in the same cache.
//!
//! ```
//! use steadfast_common::cache::memoize_recursive;
//!
//! let fib = memoize_recursive(|fib: &dyn Fn(&u64) -> u64, n: &u64| {
//!     if *n <= 1 { *n } else { fib(&(n - 1)) + fib(&(n - 2)) }
//! });
//! assert_eq!(fib.call(&50), 12_586_269_025);
//! ```

use std::fmt;
use std::hash::Hash;

use dashmap::DashMap;
use tracing::trace;

use super::stats::{MemoStats, StatsCollector};

/// A recursive function whose results are cached by argument
pub struct RecursiveMemo<K, V, S>
where
    K: Eq + Hash,
{
    step: S,
    entries: DashMap<K, V>,
    stats: StatsCollector,
}

impl<K, V, S> fmt::Debug for RecursiveMemo<K, V, S>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecursiveMemo").field("len", &self.entries.len()).finish_non_exhaustive()
    }
}

impl<K, V, S> RecursiveMemo<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: Fn(&dyn Fn(&K) -> V, &K) -> V,
{
    pub fn new(step: S) -> Self {
        Self { step, entries: DashMap::new(), stats: StatsCollector::default() }
    }

    /// Return the cached result for `key`, computing it (and any
    /// sub-results) on a miss
    pub fn call(&self, key: &K) -> V {
        if let Some(value) = self.entries.get(key) {
            self.stats.record_hit();
            return value.value().clone();
        }

        self.stats.record_miss();
        trace!("recursive memo miss");
        let recurse = |k: &K| self.call(k);
        let value = (self.step)(&recurse, key);
        self.stats.record_computation();

        // the map guard is never held across the step, so recursion through
        // `recurse` cannot deadlock on a shard lock
        self.entries.entry(key.clone()).or_insert(value).value().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> MemoStats {
        self.stats.snapshot(self.entries.len())
    }
}
