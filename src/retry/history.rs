//! The ordered log of attempts returned by the retry engine.

use std::time::Duration;

use super::attempt::Attempt;
use super::clock::span;
use super::error::RetryExhausted;

/// Every attempt of one retry sequence, in the order they ran.
///
/// A history always holds at least one attempt: the first attempt is stored
/// apart from the rest, so queries such as [`last_attempt`](Self::last_attempt)
/// never have to deal with an empty log.
///
/// The last attempt is the authoritative outcome. Because the loop stops on
/// the first success, at most one attempt is successful and it is always the
/// last one.
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
/// let mut calls = 0;
/// let history = retry.run(|| {
///     calls += 1;
///     if calls < 3 { Err("not yet") } else { Ok(calls) }
/// });
///
/// assert_eq!(history.count(), 3);
/// assert!(history.is_completed_successfully());
/// assert_eq!(history.failures().count(), 2);
/// assert_eq!(history.value(), Some(&3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RetryHistory<T, E> {
    first: Attempt<T, E>,
    rest: Vec<Attempt<T, E>>,
}

impl<T, E> RetryHistory<T, E> {
    pub(crate) fn new(first: Attempt<T, E>) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }

    /// Append `attempt` to `history`, starting a new history if there is none yet.
    pub(crate) fn record(history: Option<Self>, attempt: Attempt<T, E>) -> Self {
        match history {
            Some(mut history) => {
                history.rest.push(attempt);
                history
            }
            None => Self::new(attempt),
        }
    }

    /// Number of attempts made. Always >= 1.
    pub fn count(&self) -> usize {
        1 + self.rest.len()
    }

    /// Iterate over the attempts in chronological order.
    pub fn attempts(&self) -> impl DoubleEndedIterator<Item = &Attempt<T, E>> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    /// Alias of [`attempts`](Self::attempts).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Attempt<T, E>> {
        self.attempts()
    }

    /// The attempt at `index` (0 = first), if it exists.
    pub fn get(&self, index: usize) -> Option<&Attempt<T, E>> {
        match index {
            0 => Some(&self.first),
            n => self.rest.get(n - 1),
        }
    }

    /// The first attempt.
    pub fn first_attempt(&self) -> &Attempt<T, E> {
        &self.first
    }

    /// The final attempt, which decides the outcome of the whole sequence.
    pub fn last_attempt(&self) -> &Attempt<T, E> {
        self.rest.last().unwrap_or(&self.first)
    }

    /// Sum of every attempt's duration. Delays between attempts are not included.
    pub fn total_duration(&self) -> Duration {
        self.attempts().map(Attempt::duration).sum()
    }

    /// Wall-clock time from the first attempt's start to the last attempt's
    /// finish, delays included.
    pub fn elapsed(&self) -> Duration {
        span(self.first.start(), self.last_attempt().finish())
    }

    /// Whether the sequence ended with success.
    pub fn is_completed_successfully(&self) -> bool {
        self.last_attempt().is_completed_successfully()
    }

    /// Whether the sequence ended because cancellation was observed.
    pub fn is_canceled(&self) -> bool {
        self.last_attempt().is_canceled()
    }

    /// Attempts that did not complete successfully, in order.
    pub fn failures(&self) -> impl Iterator<Item = &Attempt<T, E>> {
        self.attempts().filter(|a| !a.is_completed_successfully())
    }

    /// The successful attempt, if the sequence succeeded.
    pub fn success_attempt(&self) -> Option<&Attempt<T, E>> {
        Some(self.last_attempt()).filter(|a| a.is_completed_successfully())
    }

    /// The value produced by the last attempt.
    ///
    /// Present when the sequence succeeded, and also when it ran out of time
    /// while the continuation predicate was still asking for retries.
    pub fn value(&self) -> Option<&T> {
        self.last_attempt().value()
    }

    /// Consume the history and take the last attempt's value.
    pub fn into_value(self) -> Option<T> {
        self.into_last_attempt().into_value()
    }

    /// Consume the history and take the last attempt.
    pub fn into_last_attempt(mut self) -> Attempt<T, E> {
        self.rest.pop().unwrap_or(self.first)
    }

    /// Consume the history into a plain vector of attempts.
    pub fn into_attempts(self) -> Vec<Attempt<T, E>> {
        let mut attempts = Vec::with_capacity(self.count());
        attempts.push(self.first);
        attempts.extend(self.rest);
        attempts
    }

    /// Turn the outcome into a `Result` so it can be propagated with `?`.
    ///
    /// Success yields the value; anything else yields [`RetryExhausted`]
    /// carrying the final failure and the attempt metadata.
    pub fn into_result(self) -> Result<T, RetryExhausted<E>> {
        let attempts = self.count();
        let total_duration = self.total_duration();
        match self.into_last_attempt().into_parts() {
            (Some(value), _, true) => Ok(value),
            (_, failure, _) => Err(RetryExhausted::new(failure, attempts, total_duration)),
        }
    }
}

impl<T, E> std::ops::Index<usize> for RetryHistory<T, E> {
    type Output = Attempt<T, E>;

    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.first,
            n => &self.rest[n - 1],
        }
    }
}

impl<T, E> IntoIterator for RetryHistory<T, E> {
    type Item = Attempt<T, E>;
    type IntoIter = std::vec::IntoIter<Attempt<T, E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_attempts().into_iter()
    }
}

impl<'a, T, E> IntoIterator for &'a RetryHistory<T, E> {
    type Item = &'a Attempt<T, E>;
    type IntoIter =
        std::iter::Chain<std::iter::Once<&'a Attempt<T, E>>, std::slice::Iter<'a, Attempt<T, E>>>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(&self.first).chain(self.rest.iter())
    }
}
