//! Testing utilities and helpers for code that retries.
//!
//! This module provides a deterministic clock and assertion macros so retry
//! behavior can be tested without real waits.
//!
//! # Examples
//!
//! ## ManualClock
//!
//! ```rust
//! use mulligan::{Retry, RetryPolicy};
//! use mulligan::testing::ManualClock;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let retry = Retry::new(RetryPolicy::new(Duration::from_secs(30)))
//!     .unwrap()
//!     .with_clock(clock.clone());
//!
//! // Thirty seconds of retries, finished instantly.
//! let history = retry.run(|| Err::<(), _>("unreachable host"));
//!
//! assert_eq!(history.count(), 151);
//! assert_eq!(clock.elapsed(), Duration::from_secs(30));
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use mulligan::{assert_completed, assert_exhausted, retry_for};
//! use std::time::Duration;
//!
//! let ok = retry_for(Duration::ZERO, || Ok::<_, String>(1));
//! assert_completed!(ok);
//!
//! let failed = retry_for(Duration::ZERO, || Err::<(), _>("nope"));
//! assert_exhausted!(failed);
//! ```

#[cfg(feature = "async")]
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use crate::retry::Clock;

/// A clock that only moves when told to.
///
/// `sleep` returns immediately and advances the clock by the requested
/// duration, recording it. Operations under test can call
/// [`advance`](Self::advance) to simulate time spent working. Clones share the
/// same time, so a clone handed to the engine and one kept by the test stay in
/// step.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ClockState>>,
}

#[derive(Debug)]
struct ClockState {
    origin: SystemTime,
    now: SystemTime,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    /// A clock starting at a fixed instant.
    pub fn new() -> Self {
        Self::starting_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }

    /// A clock starting at `origin`.
    pub fn starting_at(origin: SystemTime) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                origin,
                now: origin,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Move time forward without recording a sleep.
    ///
    /// Saturates at the latest representable `SystemTime` instead of
    /// overflowing.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.now = saturating_add(state.now, duration);
    }

    /// Every duration passed to `sleep`, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        let state = self.lock();
        state
            .now
            .duration_since(state.origin)
            .unwrap_or(Duration::ZERO)
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        self.lock().now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.now = saturating_add(state.now, duration);
        state.sleeps.push(duration);
    }

    #[cfg(feature = "async")]
    fn sleep_async(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.sleep(duration);
        std::future::ready(())
    }
}

/// `time + duration`, clamped to the furthest instant the platform can hold.
fn saturating_add(time: SystemTime, duration: Duration) -> SystemTime {
    if let Some(later) = time.checked_add(duration) {
        return later;
    }
    let mut time = time;
    let mut step = duration;
    while !step.is_zero() {
        match time.checked_add(step) {
            Some(later) => time = later,
            None => step /= 2,
        }
    }
    time
}

/// Assert that a retry history ended with success.
///
/// This macro will panic if the last attempt did not complete successfully.
///
/// # Example
///
/// ```rust
/// use mulligan::{assert_completed, retry_for};
/// use std::time::Duration;
///
/// let history = retry_for(Duration::ZERO, || Ok::<_, String>(42));
/// assert_completed!(history);
/// ```
#[macro_export]
macro_rules! assert_completed {
    ($history:expr) => {{
        let history = &$history;
        if !history.is_completed_successfully() {
            panic!(
                "Expected successful retry, got {} attempt(s) ending with {:?}",
                history.count(),
                history.last_attempt()
            );
        }
    }};
}

/// Assert that a retry history ran out of time without succeeding.
///
/// This macro will panic if the history succeeded or was canceled.
///
/// # Example
///
/// ```rust
/// use mulligan::{assert_exhausted, retry_for};
/// use std::time::Duration;
///
/// let history = retry_for(Duration::ZERO, || Err::<(), _>("still failing"));
/// assert_exhausted!(history);
/// ```
#[macro_export]
macro_rules! assert_exhausted {
    ($history:expr) => {{
        let history = &$history;
        if history.is_completed_successfully() || history.is_canceled() {
            panic!(
                "Expected exhausted retry, got {} attempt(s) ending with {:?}",
                history.count(),
                history.last_attempt()
            );
        }
    }};
}

/// Assert that a retry history ended because it was canceled.
///
/// # Example
///
/// ```rust
/// use mulligan::{assert_canceled, CancellationToken, Retry};
///
/// let token = CancellationToken::new();
/// token.cancel();
///
/// let history = Retry::default()
///     .with_cancellation(token)
///     .run(|| Ok::<_, String>(()));
/// assert_canceled!(history);
/// ```
#[macro_export]
macro_rules! assert_canceled {
    ($history:expr) => {{
        let history = &$history;
        if !history.is_canceled() {
            panic!(
                "Expected canceled retry, got {} attempt(s) ending with {:?}",
                history.count(),
                history.last_attempt()
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CancellationToken, Retry, RetryPolicy};

    #[test]
    fn manual_clock_sleep_advances_and_records() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_millis(200));
        clock.sleep(Duration::from_millis(50));

        assert_eq!(clock.now(), start + Duration::from_millis(250));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(200), Duration::from_millis(50)]
        );
    }

    #[test]
    fn manual_clock_advance_is_not_a_sleep() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(3));

        assert_eq!(clock.elapsed(), Duration::from_secs(3));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at(SystemTime::UNIX_EPOCH);
        let other = clock.clone();
        other.advance(Duration::from_secs(1));

        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH + Duration::from_secs(1));
    }

    #[test]
    fn manual_clock_saturates_instead_of_overflowing() {
        let clock = ManualClock::new();
        clock.advance(Duration::MAX);
        let far = clock.now();

        clock.sleep(Duration::MAX);
        clock.advance(Duration::from_secs(1));

        assert_eq!(clock.now(), far);
        assert!(far > SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000));
        assert_eq!(clock.sleeps(), vec![Duration::MAX]);
    }

    #[test]
    fn forever_policy_with_huge_delay_does_not_panic() {
        let token = CancellationToken::new();
        let retry = Retry::new(RetryPolicy::forever().with_delay(Duration::MAX))
            .unwrap()
            .with_clock(ManualClock::new())
            .with_cancellation(token.clone());

        let mut calls = 0;
        let history = retry.run(|| {
            calls += 1;
            if calls == 3 {
                token.cancel();
            }
            Err::<(), _>("down")
        });

        assert_eq!(history.count(), 3);
        assert_canceled!(history);
        assert_eq!(retry.clock().sleeps(), vec![Duration::MAX; 2]);
    }

    #[test]
    fn assert_completed_macro() {
        let retry = Retry::new(RetryPolicy::default())
            .unwrap()
            .with_clock(ManualClock::new());
        assert_completed!(retry.run(|| Ok::<_, ()>(1)));
    }

    #[test]
    fn assert_exhausted_macro() {
        let retry = Retry::new(RetryPolicy::default())
            .unwrap()
            .with_clock(ManualClock::new());
        assert_exhausted!(retry.run(|| Err::<(), _>("down")));
    }

    #[test]
    #[should_panic(expected = "Expected successful retry")]
    fn assert_completed_macro_panics_on_exhaustion() {
        let retry = Retry::new(RetryPolicy::new(Duration::ZERO))
            .unwrap()
            .with_clock(ManualClock::new());
        assert_completed!(retry.run(|| Err::<(), _>("down")));
    }

    #[test]
    #[should_panic(expected = "Expected canceled retry")]
    fn assert_canceled_macro_panics_on_success() {
        let retry = Retry::new(RetryPolicy::default())
            .unwrap()
            .with_clock(ManualClock::new());
        assert_canceled!(retry.run(|| Ok::<_, ()>(())));
    }
}
