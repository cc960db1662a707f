//! Failure-counting circuit breaker with a timed cool-down
//!
//! # States
//! - **Closed**: calls pass through; consecutive failures are counted
//! - **Open**: calls fail fast with [`ResilienceError::CircuitOpen`]
//! - **Half-open**: not stored; a call arriving once the cool-down has
//!   elapsed resets the breaker to closed and runs as a trial
//!
//! ```text
//! Closed --(failures >= threshold)--> Open
//! Open --(cool-down elapsed, next call)--> Closed (trial)
//! trial fails --(failures >= threshold)--> Open
//! ```
//!
//! Only state evaluation and bookkeeping happen under the lock; the guarded
//! action itself runs unlocked, so slow actions do not serialise callers.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use crate::error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
use crate::utils::duration_millis;

/// Observable breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through
    Closed,
    /// Calls are rejected
    Open,
    /// Open, but the cool-down has elapsed; the next call is a trial
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Time the circuit stays open before a trial call is allowed
    #[serde(rename = "cool_down_ms", with = "duration_millis")]
    pub cool_down: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, cool_down: Duration::from_secs(30) }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid("failure_threshold must be greater than 0"));
        }
        Ok(())
    }
}

/// Builder for [`CircuitBreakerConfig`]
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn cool_down(mut self, cool_down: Duration) -> Self {
        self.config.cool_down = cool_down;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Calls that reached the action
    pub total_calls: u64,
    /// Calls rejected while open
    pub rejected_calls: u64,
    /// Number of closed → open transitions
    pub times_opened: u64,
    pub opened_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    total_calls: u64,
    rejected_calls: u64,
    times_opened: u64,
}

/// Circuit breaker guarding calls to a failing dependency
///
/// Clones share state, so one breaker can be handed to several callers.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    state: Arc<Mutex<BreakerState>>,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("consecutive_failures", &state.consecutive_failures)
            .field("open", &state.opened_at.is_some())
            .finish()
    }
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a breaker using the system clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a breaker from a threshold and cool-down
    pub fn with_threshold(failure_threshold: u32, cool_down: Duration) -> ConfigResult<Self> {
        Self::new(CircuitBreakerConfig { failure_threshold, cool_down })
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a breaker with a custom clock
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: Arc::new(Mutex::new(BreakerState::default())),
            clock: Arc::new(clock),
        })
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Decide whether a call may proceed, collapsing an elapsed cool-down
    /// into a reset. Returns the remaining cool-down when rejecting.
    fn admit(&self) -> Result<(), Duration> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if let Some(opened_at) = state.opened_at {
            let elapsed = now.saturating_duration_since(opened_at);
            if elapsed < self.config.cool_down {
                state.rejected_calls += 1;
                return Err(self.config.cool_down - elapsed);
            }
            info!("Circuit breaker cool-down elapsed, allowing trial call");
            state.opened_at = None;
            state.consecutive_failures = 0;
        }

        state.total_calls += 1;
        Ok(())
    }

    fn on_success(&self) {
        let mut state = self.state.lock();
        if state.consecutive_failures > 0 {
            debug!("Circuit breaker: success after {} failures", state.consecutive_failures);
        }
        state.consecutive_failures = 0;
    }

    fn on_failure(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        if state.opened_at.is_none() && state.consecutive_failures >= self.config.failure_threshold
        {
            state.opened_at = Some(now);
            state.times_opened += 1;
            warn!("Circuit breaker opened after {} failures", state.consecutive_failures);
        }
    }

    /// Run an async action under breaker protection
    ///
    /// Fails fast with [`ResilienceError::CircuitOpen`] while open; otherwise
    /// runs the action and returns its failure as
    /// [`ResilienceError::OperationFailed`] after bookkeeping.
    #[instrument(skip(self, operation), fields(state = %self.state()))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        if let Err(remaining) = self.admit() {
            debug!("Circuit breaker rejecting call, {:?} of cool-down left", remaining);
            return Err(ResilienceError::CircuitOpen { remaining });
        }

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(error) => {
                warn!("Circuit breaker: operation failed - {}", error);
                self.on_failure();
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Synchronous counterpart of [`CircuitBreaker::execute`]
    #[instrument(skip(self, operation), fields(state = %self.state()))]
    pub fn call<F, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        if let Err(remaining) = self.admit() {
            debug!("Circuit breaker rejecting call, {:?} of cool-down left", remaining);
            return Err(ResilienceError::CircuitOpen { remaining });
        }

        match operation() {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(error) => {
                warn!("Circuit breaker: operation failed - {}", error);
                self.on_failure();
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Current state without mutating the breaker
    pub fn state(&self) -> CircuitState {
        let now = self.clock.now();
        let state = self.state.lock();
        match state.opened_at {
            None => CircuitState::Closed,
            Some(opened_at) if now.saturating_duration_since(opened_at) >= self.config.cool_down => {
                CircuitState::HalfOpen
            }
            Some(_) => CircuitState::Open,
        }
    }

    /// Consecutive failures recorded since the last success or reset
    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }

    /// Snapshot of counters and state
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let circuit_state = self.state();
        let state = self.state.lock();
        CircuitBreakerMetrics {
            state: circuit_state,
            consecutive_failures: state.consecutive_failures,
            total_calls: state.total_calls,
            rejected_calls: state.rejected_calls,
            times_opened: state.times_opened,
            opened_at: state.opened_at,
        }
    }

    /// Force the breaker closed and clear the failure count
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = 0;
        state.opened_at = None;
        info!("Circuit breaker manually reset to closed state");
    }
}
