//! Settings file for the memoization and resilience wrappers
//!
//! Every section is optional and falls back to its defaults, so an empty
//! document is a valid configuration:
//!
//! ```toml
//! [retry]
//! max_attempts = 5
//! jitter = "full"
//! backoff = { kind = "exponential", initial_delay_ms = 100, base = 2.0, max_delay_ms = 5000 }
//!
//! [circuit_breaker]
//! failure_threshold = 3
//! cool_down_ms = 200
//!
//! [memo]
//! ttl_ms = 100
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::MemoConfig;
use crate::error::ConfigResult;
use crate::resilience::{CircuitBreakerConfig, RetryConfig};

/// Combined settings for retry, circuit breaker and memoization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub memo: MemoConfig,
}

impl Settings {
    /// Parse and validate settings from a TOML document
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        debug!(
            max_attempts = settings.retry.max_attempts,
            failure_threshold = settings.circuit_breaker.failure_threshold,
            ttl = ?settings.memo.ttl,
            "loaded settings"
        );
        Ok(settings)
    }

    /// Read, parse and validate a TOML settings file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading settings file");
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validate every section
    pub fn validate(&self) -> ConfigResult<()> {
        self.retry.validate()?;
        self.circuit_breaker.validate()?;
        Ok(())
    }
}
