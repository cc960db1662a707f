//! Resilience wrappers for fallible actions
//!
//! - **Retry** ([`retry`], [`RetryExecutor`]): bounded attempts with a
//!   backoff strategy, jitter from an injected RNG, a policy selecting
//!   retryable failures, and cancellable waits
//! - **Circuit breaker** ([`CircuitBreaker`]): fails fast after a run of
//!   consecutive failures and lets a trial call through once a cool-down has
//!   passed
//! - **Clock** ([`Clock`], [`MockClock`]): the monotonic time source both the
//!   breaker and the memoizing cache read
//!
//! The two wrappers are independent. To combine them, guard the action with
//! a breaker and retry the guarded action; the retry policy sees
//! [`ResilienceError::CircuitOpen`] as its own variant and can decide
//! whether rejected calls are worth retrying.
//!
//! ```
//! use std::time::Duration;
//!
//! use steadfast_common::resilience::{
//!     policies, CircuitBreaker, ResilienceError, RetryConfig, RetryExecutor,
//! };
//!
//! # tokio_test::block_on(async {
//! let breaker = CircuitBreaker::with_threshold(3, Duration::from_millis(200)).unwrap();
//! let config = RetryConfig::builder()
//!     .max_attempts(4)
//!     .fixed_backoff(Duration::from_millis(1))
//!     .build()
//!     .unwrap();
//! let policy = policies::PredicateRetry::new(|err: &ResilienceError<std::io::Error>| {
//!     !err.is_circuit_open()
//! });
//!
//! let outcome = RetryExecutor::new(config, policy)
//!     .execute(|| breaker.execute(|| async { Ok::<_, std::io::Error>(42) }))
//!     .await;
//! assert_eq!(outcome.value(), Some(&42));
//! # });
//! ```

pub mod circuit_breaker;
pub mod clock;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerMetrics,
    CircuitState,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use retry::{
    policies, retry, retry_with_cancellation, retry_with_policy, BackoffStrategy, CustomBackoff,
    Jitter, RetryConfig, RetryConfigBuilder, RetryDecision, RetryExecutor, RetryOutcome,
    RetryPolicy, StopReason,
};

pub use crate::error::{ResilienceError, ResilienceResult};
