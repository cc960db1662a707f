//! Memoizing caches for single-argument functions
//!
//! Wrap a computation once and call the wrapper instead; each distinct
//! argument is computed at most once while its result stays valid.
//!
//! - [`memoize`] / [`try_memoize`]: results never expire
//! - [`memoize_with_ttl`] / [`try_memoize_with_ttl`]: results expire a fixed
//!   time after they were computed and are replaced lazily on the next call
//!   (nothing is swept in the background)
//! - [`memoize_recursive`]: recursive functions that recurse through their
//!   own cache
//!
//! The `try_` variants accept computations returning `Result`; errors are
//! handed back to the caller and never cached.
//!
//! # Example
//! ```
//! use std::time::Duration;
//!
//! use steadfast_common::cache::{memoize, memoize_with_ttl};
//!
//! let square = memoize(|n: &u64| n * n);
//! assert_eq!(square.call(&12), 144);
//! assert_eq!(square.call(&12), 144);
//! assert_eq!(square.stats().computations, 1);
//!
//! let fresh = memoize_with_ttl(|n: &u64| n + 1, Duration::from_secs(60));
//! assert_eq!(fresh.call(&1), 2);
//! ```
//!
//! # Thread Safety
//!
//! Wrappers are `Sync` whenever the computation, keys and values are, and
//! can be shared through an `Arc`. Concurrent misses on the same key may
//! compute more than once; see [`Memoized`] for which result is kept.

pub mod config;
pub mod core;
pub mod recipes;
pub mod recursive;
pub mod stats;

use std::hash::Hash;
use std::time::Duration;

pub use self::config::MemoConfig;
pub use self::core::Memoized;
pub use self::recursive::RecursiveMemo;
pub use self::stats::MemoStats;

/// Cache results of `f` forever
pub fn memoize<K, V, F>(f: F) -> Memoized<K, V, F>
where
    K: Eq + Hash + Clone,
    V: Clone,
    F: Fn(&K) -> V,
{
    Memoized::new(f, MemoConfig::no_expiry())
}

/// Cache results of `f` for `ttl` after each computation
pub fn memoize_with_ttl<K, V, F>(f: F, ttl: Duration) -> Memoized<K, V, F>
where
    K: Eq + Hash + Clone,
    V: Clone,
    F: Fn(&K) -> V,
{
    Memoized::new(f, MemoConfig::ttl(ttl))
}

/// Cache successful results of a fallible `f` forever
pub fn try_memoize<K, V, E, F>(f: F) -> Memoized<K, V, F>
where
    K: Eq + Hash + Clone,
    V: Clone,
    F: Fn(&K) -> Result<V, E>,
{
    Memoized::new(f, MemoConfig::no_expiry())
}

/// Cache successful results of a fallible `f` for `ttl`
pub fn try_memoize_with_ttl<K, V, E, F>(f: F, ttl: Duration) -> Memoized<K, V, F>
where
    K: Eq + Hash + Clone,
    V: Clone,
    F: Fn(&K) -> Result<V, E>,
{
    Memoized::new(f, MemoConfig::ttl(ttl))
}

/// Memoize a recursive function through an explicit fixed point
///
/// `step(recurse, key)` must make its recursive calls through `recurse`.
pub fn memoize_recursive<K, V, S>(step: S) -> RecursiveMemo<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: Fn(&dyn Fn(&K) -> V, &K) -> V,
{
    RecursiveMemo::new(step)
}
