//! Composable validation
//!
//! A [`Validator<T>`] checks a value and reports a [`Validation`]: a pass or
//! a list of messages. Validators combine with [`Validator::and`]
//! (short-circuits on the first failure), [`Validator::or`] (passes if
//! either side passes, otherwise keeps both sides' messages) and
//! [`Validator::compose`] (validates a projection of a larger value).
//!
//! ```
//! use steadfast_common::validation::Validator;
//!
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! let name = Validator::lift(|s: &str| !s.trim().is_empty(), "must not be empty");
//! let adult = Validator::lift(|a: &u32| (18..=120).contains(a), "age must be 18-120");
//! let user = name
//!     .compose(|u: &User| u.name.as_str())
//!     .and(adult.compose(|u: &User| &u.age));
//!
//! assert!(user.validate(&User { name: "Alice".into(), age: 30 }).is_valid());
//! let bad = user.validate(&User { name: " ".into(), age: 15 });
//! assert_eq!(bad.messages(), ["must not be empty"]);
//! ```

use std::fmt;

use thiserror::Error;

mod rules;

pub use rules::{Validator, EMAIL_PATTERN};

/// Outcome of running a validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    valid: bool,
    messages: Vec<String>,
}

impl Validation {
    /// A passing result
    pub fn ok() -> Self {
        Self { valid: true, messages: Vec::new() }
    }

    /// A failing result with one message
    pub fn fail(message: impl Into<String>) -> Self {
        Self { valid: false, messages: vec![message.into()] }
    }

    /// A failing result with several messages
    pub fn fail_all<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { valid: false, messages: messages.into_iter().map(Into::into).collect() }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// `Ok(())` when valid, otherwise the messages as a [`ValidationError`]
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.valid {
            Ok(())
        } else {
            Err(ValidationError { messages: self.messages })
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(f, "valid")
        } else {
            write!(f, "invalid: {}", self.messages.join("; "))
        }
    }
}

/// Failed validation converted into an error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {}", messages.join("; "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}
