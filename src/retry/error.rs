//! Error types for retry operations.
//!
//! A failed retry sequence is never an error on its own: the engine returns a
//! [`RetryHistory`](crate::RetryHistory) either way. These types cover the two
//! places an error does surface: a rejected configuration, and the opt-in
//! [`RetryHistory::into_result`](crate::RetryHistory::into_result) conversion.

use std::time::Duration;

use super::attempt::Failure;

/// A retry configuration rejected before any attempt was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryConfigError {
    /// Infinite timeout with a zero delay: the loop would spin at full speed
    /// and could only end by success or cancellation.
    UnboundedSpin,
}

impl std::fmt::Display for RetryConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnboundedSpin => write!(
                f,
                "retry policy with an infinite timeout needs a non-zero delay"
            ),
        }
    }
}

impl std::error::Error for RetryConfigError {}

/// The last attempt of a retry sequence did not succeed.
///
/// Built by [`RetryHistory::into_result`](crate::RetryHistory::into_result).
///
/// # Examples
///
/// ```rust
/// use mulligan::{Retry, RetryPolicy};
/// use mulligan::testing::ManualClock;
/// use std::time::Duration;
///
/// let retry = Retry::new(RetryPolicy::new(Duration::from_secs(1)))
///     .unwrap()
///     .with_clock(ManualClock::new());
///
/// let history = retry.run(|| Err::<(), _>("always fails"));
///
/// match history.into_result() {
///     Err(exhausted) => {
///         assert_eq!(exhausted.error(), Some(&"always fails"));
///         assert_eq!(exhausted.attempts, 6); // t = 0, 200, 400, 600, 800, 1000ms
///         assert!(!exhausted.is_canceled());
///     }
///     Ok(_) => panic!("Expected failure"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    /// Failure of the final attempt. `None` when the operation returned a
    /// value but the continuation predicate still asked for a retry.
    pub final_failure: Option<Failure<E>>,
    /// Total number of attempts made.
    pub attempts: usize,
    /// Sum of the attempt durations.
    pub total_duration: Duration,
}

impl<E> RetryExhausted<E> {
    /// Create a new RetryExhausted error.
    pub fn new(
        final_failure: Option<Failure<E>>,
        attempts: usize,
        total_duration: Duration,
    ) -> Self {
        Self {
            final_failure,
            attempts,
            total_duration,
        }
    }

    /// Whether the sequence ended because it was canceled.
    pub fn is_canceled(&self) -> bool {
        self.final_failure
            .as_ref()
            .is_some_and(Failure::is_canceled)
    }

    /// Get a reference to the final operation error, if any.
    pub fn error(&self) -> Option<&E> {
        self.final_failure.as_ref().and_then(Failure::error)
    }

    /// Extract the final operation error, discarding metadata.
    pub fn into_error(self) -> Option<E> {
        self.final_failure.and_then(Failure::into_error)
    }
}

impl<E: std::fmt::Display> std::fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = if self.is_canceled() {
            "retry canceled"
        } else {
            "retry exhausted"
        };
        write!(
            f,
            "{} after {} attempts ({:?})",
            verb, self.attempts, self.total_duration
        )?;
        match self.error() {
            Some(e) => write!(f, ": {}", e),
            None => Ok(()),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryExhausted<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error().map(|e| e as &(dyn std::error::Error + 'static))
    }
}
