//! Bounded retry with backoff, jitter and cancellable waits
//!
//! An operation is attempted up to `max_attempts` times. After each failure
//! the [`RetryPolicy`] decides whether the failure is worth retrying; if so
//! the executor waits `backoff(attempt)` plus jitter and tries again. The wait
//! is raced against a [`CancellationToken`], so a shutdown or deadline can
//! abort the loop between attempts. Attempt numbers are 1-based.
//!
//! The caller always gets a [`RetryOutcome`] back: the final result with the
//! last failure untouched, the exact number of attempts made and the reason
//! the loop stopped.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
use crate::utils::duration_millis;

/// Why a retry loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An attempt succeeded
    Succeeded,
    /// The policy refused to retry the last failure
    NonRetryable,
    /// `max_attempts` attempts were made and all failed
    Exhausted,
    /// The wait before the next attempt was cancelled
    Cancelled,
}

/// Result of one retry invocation
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// The successful value or the last failure, unchanged
    pub result: Result<T, E>,
    /// Number of attempts actually made
    pub attempts: u32,
    /// Why the loop ended
    pub stop_reason: StopReason,
    /// Sum of the delays that were fully waited out
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    fn new(result: Result<T, E>, attempts: u32, stop_reason: StopReason, total: Duration) -> Self {
        Self { result, attempts, stop_reason, total_delay: total }
    }

    /// Whether an attempt succeeded
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// The successful value, if any
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// The last failure, if the loop did not succeed
    pub fn last_failure(&self) -> Option<&E> {
        self.result.as_ref().err()
    }

    /// Whether the loop was aborted by cancellation
    pub fn is_cancelled(&self) -> bool {
        self.stop_reason == StopReason::Cancelled
    }

    /// Consume the outcome and return the bare result
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }

    /// Consume the outcome, tagging a cancelled loop as
    /// [`ResilienceError::Cancelled`] and any other failure as
    /// [`ResilienceError::OperationFailed`]
    pub fn into_resilience_result(self) -> ResilienceResult<T, E>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match (self.result, self.stop_reason) {
            (Ok(value), _) => Ok(value),
            (Err(last_failure), StopReason::Cancelled) => {
                Err(ResilienceError::Cancelled { attempts: self.attempts, last_failure })
            }
            (Err(source), _) => Err(ResilienceError::OperationFailed { source }),
        }
    }
}

/// Decides whether a failure should be retried
pub trait RetryPolicy<E> {
    /// Inspect the failure of attempt `attempt` (1-based)
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision returned by a [`RetryPolicy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the configured backoff plus jitter
    Retry,
    /// Retry after exactly this delay
    RetryAfter(Duration),
    /// Give up and return the failure
    Stop,
}

/// Caller-supplied backoff function
#[derive(Clone)]
pub struct CustomBackoff(Arc<dyn Fn(u32) -> Duration + Send + Sync>);

impl CustomBackoff {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for CustomBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomBackoff(..)")
    }
}

impl PartialEq for CustomBackoff {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Base delay before the next attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay after every attempt
    Fixed {
        #[serde(rename = "delay_ms", with = "duration_millis")]
        delay: Duration,
    },
    /// `initial_delay + increment * (attempt - 1)`
    Linear {
        #[serde(rename = "initial_delay_ms", with = "duration_millis")]
        initial_delay: Duration,
        #[serde(rename = "increment_ms", with = "duration_millis")]
        increment: Duration,
    },
    /// `initial_delay * base^(attempt - 1)`, capped at `max_delay`
    Exponential {
        #[serde(rename = "initial_delay_ms", with = "duration_millis")]
        initial_delay: Duration,
        base: f64,
        #[serde(rename = "max_delay_ms", with = "duration_millis")]
        max_delay: Duration,
    },
    /// Arbitrary function of the attempt number
    #[serde(skip)]
    Custom(CustomBackoff),
}

impl BackoffStrategy {
    /// Wrap a closure as a [`BackoffStrategy::Custom`]
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self::Custom(CustomBackoff::new(f))
    }

    /// Base delay after the failure of attempt `attempt` (1-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let step = attempt.saturating_sub(1);
        match self {
            Self::Fixed { delay } => *delay,
            Self::Linear { initial_delay, increment } => {
                initial_delay.saturating_add(increment.saturating_mul(step))
            }
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(step).unwrap_or(i32::MAX);
                let secs = initial_delay.as_secs_f64() * base.powi(exponent);
                Duration::try_from_secs_f64(secs).map_or(*max_delay, |d| d.min(*max_delay))
            }
            Self::Custom(CustomBackoff(f)) => f(attempt),
        }
    }
}

/// Randomisation added on top of the base delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jitter {
    /// Use the base delay as is
    None,
    /// `base + uniform[0, max(1ms, base / 2))`
    #[default]
    Additive,
    /// `uniform[0, base]`
    Full,
}

impl Jitter {
    /// Apply jitter to `base` using randomness from `rng`
    pub fn apply<R: Rng + ?Sized>(self, base: Duration, rng: &mut R) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        match self {
            Self::None => base,
            Self::Additive => {
                let bound = (base_ms / 2).max(1);
                base.saturating_add(Duration::from_millis(rng.gen_range(0..bound)))
            }
            Self::Full => Duration::from_millis(rng.gen_range(0..=base_ms)),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Base delay strategy
    pub backoff: BackoffStrategy,
    /// Randomisation applied to the base delay
    pub jitter: Jitter,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(100),
                base: 2.0,
                max_delay: Duration::from_secs(30),
            },
            jitter: Jitter::Additive,
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be greater than 0"));
        }

        if let BackoffStrategy::Exponential { base, .. } = &self.backoff {
            if !base.is_finite() || *base <= 0.0 {
                return Err(ConfigError::invalid("exponential base must be a positive number"));
            }
        }

        Ok(())
    }
}

/// Builder for [`RetryConfig`]
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed { delay };
        self
    }

    pub fn linear_backoff(mut self, initial_delay: Duration, increment: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Linear { initial_delay, increment };
        self
    }

    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, base, max_delay };
        self
    }

    pub fn custom_backoff<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        self.config.backoff = BackoffStrategy::custom(f);
        self
    }

    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.config.jitter = jitter;
        self
    }

    pub fn no_jitter(self) -> Self {
        self.jitter(Jitter::None)
    }

    pub fn build(self) -> ConfigResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Runs operations under a retry configuration and policy
///
/// Jitter randomness comes from the injected `R`; pass a seeded RNG to make
/// delays reproducible.
pub struct RetryExecutor<P, R = StdRng> {
    config: RetryConfig,
    policy: P,
    rng: Mutex<R>,
    cancel: CancellationToken,
}

impl<P, R> fmt::Debug for RetryExecutor<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<P> RetryExecutor<P, StdRng> {
    /// Create an executor with an entropy-seeded RNG
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self::with_rng(config, policy, StdRng::from_entropy())
    }
}

impl<P, R: Rng> RetryExecutor<P, R> {
    /// Create an executor with an explicit jitter source
    pub fn with_rng(config: RetryConfig, policy: P, rng: R) -> Self {
        Self { config, policy, rng: Mutex::new(rng), cancel: CancellationToken::new() }
    }

    /// Abort waits when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that aborts this executor's waits
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff.calculate_delay(attempt);
        self.config.jitter.apply(base, &mut *self.rng.lock())
    }

    /// Run `operation` until it succeeds, the policy stops, attempts run out
    /// or the wait is cancelled
    #[instrument(skip(self, operation), fields(max_attempts = self.config.max_attempts))]
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut total_delay = Duration::ZERO;
        let mut attempt = 1;

        loop {
            debug!("Executing operation (attempt {}/{})", attempt, max_attempts);

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Operation succeeded after {} attempts", attempt);
                    }
                    return RetryOutcome::new(
                        Ok(value),
                        attempt,
                        StopReason::Succeeded,
                        total_delay,
                    );
                }
                Err(error) => error,
            };

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!("Retry policy declined to retry: {:?}", error);
                    return RetryOutcome::new(
                        Err(error),
                        attempt,
                        StopReason::NonRetryable,
                        total_delay,
                    );
                }
                _ if attempt >= max_attempts => {
                    warn!("All {} attempts exhausted, last error: {:?}", attempt, error);
                    return RetryOutcome::new(
                        Err(error),
                        attempt,
                        StopReason::Exhausted,
                        total_delay,
                    );
                }
                RetryDecision::Retry => self.next_delay(attempt),
                RetryDecision::RetryAfter(delay) => delay,
            };

            warn!("Operation failed (attempt {}): {:?}, retrying after {:?}", attempt, error, delay);

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    info!("Retry cancelled while waiting after attempt {}", attempt);
                    return RetryOutcome::new(
                        Err(error),
                        attempt,
                        StopReason::Cancelled,
                        total_delay,
                    );
                }
                () = tokio::time::sleep(delay) => {}
            }

            total_delay += delay;
            attempt += 1;
        }
    }
}

/// Run `operation` with an explicit configuration and policy
pub async fn retry_with_policy<F, Fut, T, E, P>(
    config: RetryConfig,
    policy: P,
    operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: RetryPolicy<E>,
    E: fmt::Debug,
{
    RetryExecutor::new(config, policy).execute(operation).await
}

/// Retry `action` up to `max_attempts` times
///
/// `backoff` maps the failed attempt number to a base delay, `retry_on`
/// selects retryable failures and `rng` supplies additive jitter of up to
/// half the base delay. A `max_attempts` of zero is treated as one. The
/// loop cannot be cancelled; use [`retry_with_cancellation`] for that.
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use steadfast_common::resilience::retry;
///
/// # tokio_test::block_on(async {
/// let outcome = retry(
///     || async { Ok::<_, std::io::Error>("OK") },
///     5,
///     |attempt| Duration::from_millis(10 * u64::from(attempt)),
///     |_err: &std::io::Error| true,
///     StdRng::seed_from_u64(42),
/// )
/// .await;
/// assert_eq!(outcome.attempts, 1);
/// assert_eq!(outcome.value(), Some(&"OK"));
/// # });
/// ```
pub async fn retry<F, Fut, T, E, B, P, R>(
    action: F,
    max_attempts: u32,
    backoff: B,
    retry_on: P,
    rng: R,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    B: Fn(u32) -> Duration + Send + Sync + 'static,
    P: Fn(&E) -> bool,
    R: Rng,
    E: fmt::Debug,
{
    let cancel = CancellationToken::new();
    retry_with_cancellation(action, max_attempts, backoff, retry_on, rng, cancel).await
}

/// [`retry`] with a cancellation signal
///
/// Cancelling `cancel` while the loop waits between attempts ends it with
/// [`StopReason::Cancelled`] and the last failure. An attempt already in
/// flight is not interrupted.
pub async fn retry_with_cancellation<F, Fut, T, E, B, P, R>(
    action: F,
    max_attempts: u32,
    backoff: B,
    retry_on: P,
    rng: R,
    cancel: CancellationToken,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    B: Fn(u32) -> Duration + Send + Sync + 'static,
    P: Fn(&E) -> bool,
    R: Rng,
    E: fmt::Debug,
{
    let config = RetryConfig {
        max_attempts,
        backoff: BackoffStrategy::custom(backoff),
        jitter: Jitter::Additive,
    };
    RetryExecutor::with_rng(config, policies::PredicateRetry::new(retry_on), rng)
        .with_cancellation(cancel)
        .execute(action)
        .await
}

/// Ready-made retry policies
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Retry every failure
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retry
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Retry failures for which the predicate returns `true`
    #[derive(Debug, Clone)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E) -> bool,
    {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if (self.predicate)(error) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}
