//! Memoization and resilience building blocks.
//!
//! - [`cache`]: memoize pure or fallible functions, optionally with a TTL,
//!   including recursive functions whose sub-results share one cache
//! - [`resilience`]: retry with backoff and jitter, plus a circuit breaker
//!   that stops calling a failing dependency for a cool-down period
//! - [`validation`]: composable validators
//! - [`config`]: TOML settings for all of the above
//!
//! # Feature Tiers
//!
//! - `foundation`: errors, validation, serde helpers
//! - `runtime` (default): cache, resilience, settings (tokio, dashmap, tracing)
//! - `test-utils`: [`testing`] helpers for downstream test suites

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;
#[cfg(feature = "foundation")]
pub mod validation;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod cache;
#[cfg(feature = "runtime")]
pub mod config;
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use cache::{
    memoize, memoize_recursive, memoize_with_ttl, try_memoize, try_memoize_with_ttl, MemoConfig,
    MemoStats, Memoized, RecursiveMemo,
};
#[cfg(feature = "runtime")]
pub use config::Settings;
#[cfg(feature = "foundation")]
pub use error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
#[cfg(feature = "runtime")]
pub use resilience::{
    retry, retry_with_cancellation, retry_with_policy, BackoffStrategy, CircuitBreaker,
    CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState, Clock, Jitter, MockClock,
    RetryConfig, RetryDecision, RetryExecutor, RetryOutcome, RetryPolicy, StopReason, SystemClock,
};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
#[cfg(feature = "foundation")]
pub use validation::{Validation, ValidationError, Validator, EMAIL_PATTERN};
