//! Memoization configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::option_duration_millis;

/// How long memoized results stay valid
///
/// `ttl = None` keeps results forever. A zero TTL makes every call
/// recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoConfig {
    #[serde(default, rename = "ttl_ms", with = "option_duration_millis")]
    pub ttl: Option<Duration>,
}

impl MemoConfig {
    /// Results never expire
    pub fn no_expiry() -> Self {
        Self { ttl: None }
    }

    /// Results expire `ttl` after they were computed
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use steadfast_common::cache::MemoConfig;
    ///
    /// let config = MemoConfig::ttl(Duration::from_millis(100));
    /// assert_eq!(config.ttl, Some(Duration::from_millis(100)));
    /// ```
    pub fn ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }
}
