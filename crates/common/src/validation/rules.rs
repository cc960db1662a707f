//! Validator combinators

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::Validation;

/// `local@domain.tld` with no whitespace and a single `@`
pub const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn email_regex() -> Option<&'static Regex> {
    EMAIL_REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

/// A reusable, cheaply clonable check over values of type `T`
pub struct Validator<T: ?Sized + 'static> {
    check: Arc<dyn Fn(&T) -> Validation + Send + Sync>,
}

impl<T: ?Sized + 'static> Clone for Validator<T> {
    fn clone(&self) -> Self {
        Self { check: Arc::clone(&self.check) }
    }
}

impl<T: ?Sized + 'static> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

impl<T: ?Sized + 'static> Validator<T> {
    /// Build a validator from a function returning a [`Validation`]
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&T) -> Validation + Send + Sync + 'static,
    {
        Self { check: Arc::new(check) }
    }

    /// Turn a predicate into a validator failing with `message`
    pub fn lift<P>(predicate: P, message: impl Into<String>) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        Self::new(move |value| {
            if predicate(value) {
                Validation::ok()
            } else {
                Validation::fail(message.clone())
            }
        })
    }

    /// Run the check
    pub fn validate(&self, value: &T) -> Validation {
        (self.check)(value)
    }

    /// Both must pass; stops at the first failure and reports only it
    #[must_use]
    pub fn and(self, other: Validator<T>) -> Validator<T> {
        Self::new(move |value| {
            let first = self.validate(value);
            if !first.is_valid() {
                return first;
            }
            other.validate(value)
        })
    }

    /// Either may pass; when both fail, messages from both are kept in order
    #[must_use]
    pub fn or(self, other: Validator<T>) -> Validator<T> {
        Self::new(move |value| {
            let first = self.validate(value);
            if first.is_valid() {
                return Validation::ok();
            }
            let second = other.validate(value);
            if second.is_valid() {
                return Validation::ok();
            }
            Validation::fail_all(first.messages.into_iter().chain(second.messages))
        })
    }

    /// Validate a `U` by checking the `T` that `project` borrows from it
    pub fn compose<U, M>(self, project: M) -> Validator<U>
    where
        U: ?Sized + 'static,
        M: Fn(&U) -> &T + Send + Sync + 'static,
    {
        Validator::new(move |outer: &U| self.validate(project(outer)))
    }
}

impl Validator<str> {
    /// Strings matching the regular expression `pattern`
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(Self::lift(move |s: &str| regex.is_match(s), message))
    }

    /// Strings shaped like an email address, per [`EMAIL_PATTERN`]
    pub fn email(message: impl Into<String>) -> Self {
        Self::lift(|s: &str| email_regex().is_some_and(|re| re.is_match(s)), message)
    }
}
