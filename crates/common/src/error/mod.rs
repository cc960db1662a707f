//! Error types shared by the cache and resilience modules
//!
//! The taxonomy is intentionally small:
//!
//! | Condition | Type |
//! |-----------|------|
//! | The wrapped computation failed | the caller's own `E` (or [`ResilienceError::OperationFailed`] from a breaker) |
//! | The breaker rejected the call | [`ResilienceError::CircuitOpen`] |
//! | A retry wait was cancelled | [`ResilienceError::Cancelled`] |
//! | A configuration value is invalid | [`ConfigError`] |
//!
//! Caches and the retry loop never wrap the caller's failure; the breaker
//! wraps it in a variant so callers (and retry policies) can tell a rejected
//! call apart from a failed one by matching instead of downcasting.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while building or loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed validation
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// A settings document could not be parsed
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// A settings file could not be read
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced by the resilience wrappers
///
/// Generic over the underlying operation error `E` so the original failure
/// is preserved untouched inside [`ResilienceError::OperationFailed`].
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Circuit breaker is open, the action was not invoked
    #[error("Circuit breaker is open, retry in {remaining:?}")]
    CircuitOpen { remaining: Duration },

    /// The retry wait was interrupted by a cancellation signal
    #[error("Retry cancelled after {attempts} attempts")]
    Cancelled {
        attempts: u32,
        #[source]
        last_failure: E,
    },

    /// The underlying operation failed
    #[error("Operation failed: {source}")]
    OperationFailed {
        #[source]
        source: E,
    },
}

impl<E> ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Returns `true` when the breaker rejected the call without running it
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Returns `true` when a retry wait was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Borrow the caller's original failure, if this error carries one
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::OperationFailed { source } => Some(source),
            Self::Cancelled { last_failure, .. } => Some(last_failure),
            Self::CircuitOpen { .. } => None,
        }
    }

    /// Consume the error and return the caller's original failure, if any
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::OperationFailed { source } => Some(source),
            Self::Cancelled { last_failure, .. } => Some(last_failure),
            Self::CircuitOpen { .. } => None,
        }
    }
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_circuit_open_is_distinguishable() {
        let err: ResilienceError<Boom> =
            ResilienceError::CircuitOpen { remaining: Duration::from_millis(250) };
        assert!(err.is_circuit_open());
        assert!(!err.is_cancelled());
        assert!(err.operation_error().is_none());
        assert!(err.to_string().contains("open"));
    }

    #[test]
    fn test_operation_failed_preserves_source() {
        let err = ResilienceError::OperationFailed { source: Boom };
        assert_eq!(err.operation_error(), Some(&Boom));
        assert_eq!(err.to_string(), "Operation failed: boom");
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.into_operation_error(), Some(Boom));
    }

    #[test]
    fn test_cancelled_carries_last_failure() {
        let err = ResilienceError::Cancelled { attempts: 2, last_failure: Boom };
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("2 attempts"));
        assert_eq!(err.into_operation_error(), Some(Boom));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("max_attempts must be greater than 0");
        assert_eq!(err.to_string(), "Invalid configuration: max_attempts must be greater than 0");
    }
}
