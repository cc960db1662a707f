//! Memoized single-argument functions
//!
//! [`Memoized`] owns a computation and a concurrent map from argument to
//! result. Lookups and inserts are safe from many threads; computations run
//! outside any map lock, so two threads missing the same key at the same
//! time may both compute it (no single-flight). Without a TTL the first
//! stored value wins and every caller returns it; with a TTL the latest
//! computation replaces the stale entry.
//!
//! Failed computations are returned to the caller and never stored.

use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::trace;

use super::config::MemoConfig;
use super::stats::{MemoStats, StatsCollector};
use crate::resilience::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` never expires
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// A function wrapped with a result cache keyed by its argument
///
/// Build one with [`memoize`](super::memoize),
/// [`memoize_with_ttl`](super::memoize_with_ttl) or their `try_` variants.
pub struct Memoized<K, V, F, C = SystemClock>
where
    K: Eq + Hash,
    C: Clock,
{
    compute: F,
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Option<Duration>,
    clock: C,
    stats: StatsCollector,
}

impl<K, V, F, C> fmt::Debug for Memoized<K, V, F, C>
where
    K: Eq + Hash,
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("ttl", &self.ttl)
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<K, V, F> Memoized<K, V, F, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Wrap `compute` using the system clock
    pub fn new(compute: F, config: MemoConfig) -> Self {
        Self::with_clock(compute, config, SystemClock)
    }
}

impl<K, V, F, C> Memoized<K, V, F, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    /// Wrap `compute` with an explicit clock
    pub fn with_clock(compute: F, config: MemoConfig, clock: C) -> Self {
        Self { compute, entries: DashMap::new(), ttl: config.ttl, clock, stats: StatsCollector::default() }
    }

    fn lookup(&self, key: &K, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_fresh(now) {
            self.stats.record_hit();
            trace!("memo hit");
            Some(entry.value.clone())
        } else {
            self.stats.record_expiration();
            trace!("memo entry expired");
            None
        }
    }

    fn store(&self, key: &K, value: V, now: Instant) -> V {
        self.stats.record_computation();
        match self.ttl {
            None => self
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry { value, expires_at: None })
                .value
                .clone(),
            Some(ttl) => {
                let expires_at = now.checked_add(ttl);
                self.entries.insert(key.clone(), CacheEntry { value: value.clone(), expires_at });
                value
            }
        }
    }

    /// Time-to-live of stored results, if any
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Number of stored entries, including stale ones not yet replaced
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a fresh result is cached for `key`
    pub fn contains(&self, key: &K) -> bool {
        let now = self.clock.now();
        self.entries.get(key).is_some_and(|entry| entry.is_fresh(now))
    }

    /// Drop the cached result for `key`; the next call recomputes it
    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Drop every cached result and reset statistics
    pub fn clear(&self) {
        self.entries.clear();
        self.stats.reset();
    }

    /// Counters snapshot
    pub fn stats(&self) -> MemoStats {
        self.stats.snapshot(self.entries.len())
    }
}

impl<K, V, F, C> Memoized<K, V, F, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    F: Fn(&K) -> V,
    C: Clock,
{
    /// Return the cached result for `key`, computing it on a miss
    pub fn call(&self, key: &K) -> V {
        let now = self.clock.now();
        if let Some(value) = self.lookup(key, now) {
            return value;
        }

        self.stats.record_miss();
        let value = (self.compute)(key);
        self.store(key, value, now)
    }

    /// Borrow the memoized function as a plain closure
    pub fn as_fn(&self) -> impl Fn(&K) -> V + '_ {
        move |key| self.call(key)
    }
}

impl<K, V, E, F, C> Memoized<K, V, F, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    F: Fn(&K) -> Result<V, E>,
    C: Clock,
{
    /// Return the cached result for `key`, computing it on a miss
    ///
    /// An error from the computation is returned as is and leaves the cache
    /// untouched, so the next call for `key` computes again.
    pub fn try_call(&self, key: &K) -> Result<V, E> {
        let now = self.clock.now();
        if let Some(value) = self.lookup(key, now) {
            return Ok(value);
        }

        self.stats.record_miss();
        match (self.compute)(key) {
            Ok(value) => Ok(self.store(key, value, now)),
            Err(error) => {
                self.stats.record_failure();
                trace!("memo computation failed, not caching");
                Err(error)
            }
        }
    }

    /// Borrow the fallible memoized function as a plain closure
    pub fn as_try_fn(&self) -> impl Fn(&K) -> Result<V, E> + '_ {
        move |key| self.try_call(key)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for memoized lookups, expiry and failure handling

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::resilience::MockClock;

    fn counting_square(
        calls: &Arc<AtomicU32>,
        config: MemoConfig,
        clock: MockClock,
    ) -> Memoized<u64, u64, impl Fn(&u64) -> u64, MockClock> {
        let calls = Arc::clone(calls);
        Memoized::with_clock(
            move |n: &u64| {
                calls.fetch_add(1, Ordering::SeqCst);
                n * n
            },
            config,
            clock,
        )
    }

    #[test]
    fn test_computes_once_per_key() {
        let calls = Arc::new(AtomicU32::new(0));
        let memo = counting_square(&calls, MemoConfig::no_expiry(), MockClock::new());

        assert_eq!(memo.call(&10), 100);
        assert_eq!(memo.call(&10), 100);
        assert_eq!(memo.call(&3), 9);
        assert_eq!(memo.call(&3), 9);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let stats = memo.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.size, 2);
    }

    #[test]
    fn test_no_expiry_survives_time() {
        let calls = Arc::new(AtomicU32::new(0));
        let clock = MockClock::new();
        let memo = counting_square(&calls, MemoConfig::no_expiry(), clock.clone());

        memo.call(&4);
        clock.advance(Duration::from_secs(86_400));
        memo.call(&4);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ttl_expiry_recomputes() {
        let calls = Arc::new(AtomicU32::new(0));
        let clock = MockClock::new();
        let memo = counting_square(&calls, MemoConfig::ttl(Duration::from_millis(100)), clock.clone());

        assert_eq!(memo.call(&5), 25);
        clock.advance_millis(50);
        assert_eq!(memo.call(&5), 25);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance_millis(50);
        assert!(!memo.contains(&5));
        assert_eq!(memo.call(&5), 25);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(memo.stats().expirations, 1);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_zero_ttl_always_recomputes() {
        let calls = Arc::new(AtomicU32::new(0));
        let memo = counting_square(&calls, MemoConfig::ttl(Duration::ZERO), MockClock::new());

        for _ in 0..3 {
            assert_eq!(memo.call(&2), 4);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let attempts = AtomicU32::new(0);
        let memo = Memoized::new(
            |key: &String| {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(format!("cannot parse {key}"))
                } else {
                    Ok(key.len())
                }
            },
            MemoConfig::no_expiry(),
        );
        let key = "hello".to_string();

        assert_eq!(memo.try_call(&key), Err("cannot parse hello".to_string()));
        assert!(memo.is_empty());
        assert_eq!(memo.try_call(&key), Ok(5));
        assert_eq!(memo.try_call(&key), Ok(5));

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        let stats = memo.stats();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.computations, 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let calls = Arc::new(AtomicU32::new(0));
        let memo = counting_square(&calls, MemoConfig::no_expiry(), MockClock::new());

        memo.call(&7);
        assert_eq!(memo.invalidate(&7), Some(49));
        assert_eq!(memo.invalidate(&7), None);
        memo.call(&7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        memo.clear();
        assert!(memo.is_empty());
        assert_eq!(memo.stats(), MemoStats::default());
    }

    #[test]
    fn test_as_fn_shares_cache() {
        let calls = Arc::new(AtomicU32::new(0));
        let memo = counting_square(&calls, MemoConfig::no_expiry(), MockClock::new());
        let square = memo.as_fn();

        let total: u64 = [1, 2, 3, 1, 2, 3].iter().map(|n| square(n)).sum();

        assert_eq!(total, 28);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_concurrent_callers_observe_single_value() {
        let memo = Arc::new(Memoized::new(
            |key: &u32| {
                std::thread::sleep(Duration::from_millis(5));
                format!("value-{key}")
            },
            MemoConfig::no_expiry(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let memo = Arc::clone(&memo);
                std::thread::spawn(move || memo.call(&(i % 2)))
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let value = handle.join().expect("thread panicked");
            assert_eq!(value, format!("value-{}", i % 2));
        }
        assert_eq!(memo.len(), 2);
    }
}
