//! A single execution of a retried operation.

use std::time::{Duration, SystemTime};

use super::clock::span;

/// Why an attempt did not complete successfully.
///
/// Ordinary operation errors and the synthetic cancellation condition are kept
/// apart so callers can tell "the operation failed" from "we were told to stop".
/// An attempt whose continuation predicate asked for another retry has no
/// `Failure` at all.
///
/// # Examples
///
/// ```rust
/// use mulligan::Failure;
///
/// let failure: Failure<&str> = Failure::Operation("connection refused");
/// assert!(!failure.is_canceled());
/// assert_eq!(failure.error(), Some(&"connection refused"));
///
/// let canceled: Failure<&str> = Failure::Canceled(None);
/// assert!(canceled.is_canceled());
/// assert_eq!(canceled.error(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Failure<E> {
    /// The operation returned an error.
    Operation(E),
    /// Cancellation was observed for this attempt.
    ///
    /// Holds the operation's error when the interrupted attempt had raised one.
    Canceled(Option<E>),
}

impl<E> Failure<E> {
    /// Returns true for the cancellation condition.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled(_))
    }

    /// The operation's own error, if it raised one.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Operation(e) | Self::Canceled(Some(e)) => Some(e),
            Self::Canceled(None) => None,
        }
    }

    /// Extract the operation's error, discarding the classification.
    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Operation(e) | Self::Canceled(Some(e)) => Some(e),
            Self::Canceled(None) => None,
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operation(e) => write!(f, "{}", e),
            Self::Canceled(None) => write!(f, "retry canceled"),
            Self::Canceled(Some(e)) => write!(f, "retry canceled: {}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Failure<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Operation(e) | Self::Canceled(Some(e)) => Some(e),
            Self::Canceled(None) => None,
        }
    }
}

/// The record of one attempt: when it ran, what it produced, how it ended.
///
/// Attempts are created by the retry engine and are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Attempt<T, E> {
    start: SystemTime,
    finish: SystemTime,
    value: Option<T>,
    failure: Option<Failure<E>>,
    completed_successfully: bool,
    canceled: bool,
}

impl<T, E> Attempt<T, E> {
    /// The operation returned and no further attempt is wanted.
    pub(crate) fn succeeded(start: SystemTime, finish: SystemTime, value: T) -> Self {
        Self {
            start,
            finish,
            value: Some(value),
            failure: None,
            completed_successfully: true,
            canceled: false,
        }
    }

    /// The operation returned but the continuation predicate asked for more.
    pub(crate) fn retry_requested(start: SystemTime, finish: SystemTime, value: T) -> Self {
        Self {
            start,
            finish,
            value: Some(value),
            failure: None,
            completed_successfully: false,
            canceled: false,
        }
    }

    pub(crate) fn faulted(start: SystemTime, finish: SystemTime, error: E) -> Self {
        Self {
            start,
            finish,
            value: None,
            failure: Some(Failure::Operation(error)),
            completed_successfully: false,
            canceled: false,
        }
    }

    /// Cancellation observed. `value` and `error` are whatever the interrupted
    /// operation produced; both are `None` when it never ran.
    pub(crate) fn canceled(
        start: SystemTime,
        finish: SystemTime,
        value: Option<T>,
        error: Option<E>,
    ) -> Self {
        Self {
            start,
            finish,
            value,
            failure: Some(Failure::Canceled(error)),
            completed_successfully: false,
            canceled: true,
        }
    }

    /// When the attempt started.
    pub fn start(&self) -> SystemTime {
        self.start
    }

    /// When the attempt finished.
    pub fn finish(&self) -> SystemTime {
        self.finish
    }

    /// `finish - start`, never negative.
    pub fn duration(&self) -> Duration {
        span(self.start, self.finish)
    }

    /// The value the operation returned, if it returned normally.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consume the attempt and take its value.
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// The captured failure, if any.
    pub fn failure(&self) -> Option<&Failure<E>> {
        self.failure.as_ref()
    }

    /// The operation's own error, if it raised one.
    ///
    /// Unlike [`failure`](Self::failure) this is `None` for an attempt that was
    /// canceled before the operation ran.
    pub fn error(&self) -> Option<&E> {
        self.failure.as_ref().and_then(Failure::error)
    }

    /// Whether this attempt ended the retry loop with success.
    pub fn is_completed_successfully(&self) -> bool {
        self.completed_successfully
    }

    /// Whether this attempt ended because cancellation was observed.
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Whether the operation itself raised an error during this attempt.
    pub fn is_faulted(&self) -> bool {
        self.error().is_some()
    }

    pub(crate) fn into_parts(self) -> (Option<T>, Option<Failure<E>>, bool) {
        (self.value, self.failure, self.completed_successfully)
    }
}
