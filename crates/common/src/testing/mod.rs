//! Testing utilities and helpers
//!
//! - [`FlakyService`]: fails a fixed number of calls, then succeeds
//! - [`init_test_tracing`]: route `tracing` output to the test harness
//!
//! Controllable time lives in [`crate::resilience::MockClock`].
//!
//! ```rust
//! use steadfast_common::testing::FlakyService;
//!
//! let service = FlakyService::new(2);
//! assert!(service.call("data").is_err());
//! assert!(service.call("data").is_err());
//! assert_eq!(service.call("data").unwrap(), "data (call 3)");
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Failure returned by [`FlakyService`] while it is still failing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("service unavailable (call {call})")]
pub struct FlakyError {
    pub call: u32,
}

/// A service stub whose first `failures` calls fail
///
/// Clones share the call counter.
#[derive(Debug, Clone)]
pub struct FlakyService {
    failures: u32,
    calls: Arc<AtomicU32>,
}

impl FlakyService {
    pub fn new(failures: u32) -> Self {
        Self { failures, calls: Arc::new(AtomicU32::new(0)) }
    }

    /// Fail with [`FlakyError`] for the first `failures` calls, then return
    /// `"{value} (call n)"`
    pub fn call(&self, value: &str) -> Result<String, FlakyError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(FlakyError { call })
        } else {
            Ok(format!("{value} (call {call})"))
        }
    }

    /// Number of calls made so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Install a test-writer subscriber honoring `RUST_LOG`
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
