//! Small shared helpers
//!
//! - **[`serde`]**: serde adapters for durations stored as milliseconds

pub mod serde;

pub use self::serde::{duration_millis, option_duration_millis};
