//! The retry control loop.

use std::ops::ControlFlow;
use std::time::{Duration, SystemTime};

use super::attempt::{Attempt, Failure};
use super::cancel::CancellationToken;
use super::clock::{span, Clock, SystemClock};
use super::error::RetryConfigError;
use super::history::RetryHistory;
use super::policy::RetryPolicy;

/// Runs an operation until it succeeds, the policy's timeout runs out, or
/// cancellation is requested, and returns every attempt it made.
///
/// One loop serves every operation shape:
///
/// - [`run`](Self::run) retries until the operation returns `Ok`. Use `T = ()`
///   for operations that produce nothing.
/// - [`run_while`](Self::run_while) also asks a continuation predicate about
///   each returned value and retries while it answers `true`.
///
/// Each iteration resolves in a fixed order: success (or a satisfied
/// predicate) ends the loop, then observed cancellation, then an expired
/// timeout; otherwise the engine sleeps for the policy's delay and tries again.
/// Failed attempts are recorded, never returned as errors.
///
/// The loop blocks the calling thread, delays included. Cancellation is polled
/// before each attempt and after each failed one; an operation that is already
/// running is never interrupted.
///
/// # Examples
///
/// ```rust
/// use mulligan::{CancellationToken, Retry, RetryPolicy};
/// use mulligan::testing::ManualClock;
/// use std::time::Duration;
///
/// let token = CancellationToken::new();
/// let retry = Retry::new(RetryPolicy::forever().with_delay(Duration::from_millis(10)))
///     .unwrap()
///     .with_clock(ManualClock::new())
///     .with_cancellation(token.clone());
///
/// let mut polls = 0;
/// let history = retry.run_while(
///     || {
///         polls += 1;
///         if polls == 4 {
///             token.cancel();
///         }
///         Ok::<_, String>(polls)
///     },
///     |ready| *ready < 10,
/// );
///
/// assert!(history.is_canceled());
/// assert_eq!(history.count(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct Retry<C = SystemClock> {
    policy: RetryPolicy,
    clock: C,
    cancellation: Option<CancellationToken>,
}

/// What the loop does after an attempt has been recorded.
type Verdict = ControlFlow<()>;

impl Retry<SystemClock> {
    /// Create an engine for `policy`, using the system clock.
    ///
    /// Fails if the policy does not [`validate`](RetryPolicy::validate).
    pub fn new(policy: RetryPolicy) -> Result<Self, RetryConfigError> {
        policy.validate()?;
        Ok(Self {
            policy,
            clock: SystemClock,
            cancellation: None,
        })
    }
}

impl Default for Retry<SystemClock> {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            clock: SystemClock,
            cancellation: None,
        }
    }
}

impl<C: Clock> Retry<C> {
    /// Replace the clock used for timestamps, timeout checks and delays.
    pub fn with_clock<D: Clock>(self, clock: D) -> Retry<D> {
        Retry {
            policy: self.policy,
            clock,
            cancellation: self.cancellation,
        }
    }

    /// Stop retrying once `token` is canceled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The policy this engine runs with.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The clock this engine reads.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Retry `operation` until it returns `Ok`.
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
    /// let mut remaining_failures = 2;
    /// let history = retry.run(|| {
    ///     if remaining_failures > 0 {
    ///         remaining_failures -= 1;
    ///         Err("busy")
    ///     } else {
    ///         Ok(())
    ///     }
    /// });
    ///
    /// assert!(history.is_completed_successfully());
    /// assert_eq!(history.count(), 3);
    /// ```
    pub fn run<T, E, F>(&self, operation: F) -> RetryHistory<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.run_while(operation, |_: &T| false)
    }

    /// Retry `operation` until it returns a value for which `keep_retrying`
    /// answers `false`.
    ///
    /// An attempt whose operation fails never reaches the predicate. An attempt
    /// the predicate rejects is recorded with its value and without a failure.
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
    /// let mut readings = vec![5, 3, 0].into_iter();
    /// let history = retry.run_while(
    ///     || readings.next().ok_or("sensor offline"),
    ///     |queue_depth| *queue_depth > 0,
    /// );
    ///
    /// assert!(history.is_completed_successfully());
    /// assert_eq!(history.value(), Some(&0));
    /// assert!(history.attempts().all(|a| a.failure().is_none()));
    /// ```
    pub fn run_while<T, E, F, P>(
        &self,
        mut operation: F,
        mut keep_retrying: P,
    ) -> RetryHistory<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: FnMut(&T) -> bool,
    {
        let began = self.clock.now();
        let mut history = None;

        loop {
            let started = self.clock.now();
            let outcome = if self.cancellation_requested() {
                None
            } else {
                Some(operation())
            };
            let (attempt, verdict) = self.settle(began, started, outcome, &mut keep_retrying);

            let recorded = RetryHistory::record(history.take(), attempt);
            if verdict.is_break() {
                return self.finish(recorded);
            }
            self.note_retry(&recorded, began);
            history = Some(recorded);

            self.clock.sleep(self.policy.delay());
        }
    }

    /// Async form of [`run`](Self::run): the operation returns a future and the
    /// delay between attempts awaits [`Clock::sleep_async`] instead of blocking.
    ///
    /// Attempts still run one at a time.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mulligan::{Retry, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let retry = Retry::new(
    ///     RetryPolicy::new(Duration::from_secs(1)).with_delay(Duration::from_millis(1)),
    /// )
    /// .unwrap();
    ///
    /// let mut calls = 0;
    /// let history = retry
    ///     .run_async(|| {
    ///         calls += 1;
    ///         let attempt = calls;
    ///         async move { if attempt < 2 { Err("cold cache") } else { Ok(attempt) } }
    ///     })
    ///     .await;
    ///
    /// assert_eq!(history.value(), Some(&2));
    /// # });
    /// ```
    #[cfg(feature = "async")]
    pub async fn run_async<T, E, F, Fut>(&self, operation: F) -> RetryHistory<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.run_while_async(operation, |_: &T| false).await
    }

    /// Async form of [`run_while`](Self::run_while).
    #[cfg(feature = "async")]
    pub async fn run_while_async<T, E, F, P, Fut>(
        &self,
        mut operation: F,
        mut keep_retrying: P,
    ) -> RetryHistory<T, E>
    where
        F: FnMut() -> Fut,
        P: FnMut(&T) -> bool,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let began = self.clock.now();
        let mut history = None;

        loop {
            let started = self.clock.now();
            let outcome = if self.cancellation_requested() {
                None
            } else {
                Some(operation().await)
            };
            let (attempt, verdict) = self.settle(began, started, outcome, &mut keep_retrying);

            let recorded = RetryHistory::record(history.take(), attempt);
            if verdict.is_break() {
                return self.finish(recorded);
            }
            self.note_retry(&recorded, began);
            history = Some(recorded);

            self.clock.sleep_async(self.policy.delay()).await;
        }
    }

    /// Classify one attempt. `outcome` is `None` when cancellation was already
    /// requested and the operation was skipped.
    fn settle<T, E, P>(
        &self,
        began: SystemTime,
        started: SystemTime,
        outcome: Option<Result<T, E>>,
        keep_retrying: &mut P,
    ) -> (Attempt<T, E>, Verdict)
    where
        P: FnMut(&T) -> bool,
    {
        let finished = self.clock.now();

        let attempt = match outcome {
            None => {
                return (
                    Attempt::canceled(started, finished, None, None),
                    Verdict::Break(()),
                );
            }
            Some(Ok(value)) => {
                if !keep_retrying(&value) {
                    return (Attempt::succeeded(started, finished, value), Verdict::Break(()));
                }
                Attempt::retry_requested(started, finished, value)
            }
            Some(Err(error)) => Attempt::faulted(started, finished, error),
        };

        // Cancellation requested while the operation was running.
        if self.cancellation_requested() {
            let (value, failure, _) = attempt.into_parts();
            let error = failure.and_then(Failure::into_error);
            return (
                Attempt::canceled(started, finished, value, error),
                Verdict::Break(()),
            );
        }

        if self.policy.is_expired(span(began, self.clock.now())) {
            return (attempt, Verdict::Break(()));
        }

        (attempt, Verdict::Continue(()))
    }

    fn cancellation_requested(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_canceled)
    }

    fn note_retry<T, E>(&self, history: &RetryHistory<T, E>, began: SystemTime) {
        trace_retry(
            history.last_attempt(),
            history.count(),
            span(began, self.clock.now()),
            self.policy.delay(),
        );
    }

    fn finish<T, E>(&self, history: RetryHistory<T, E>) -> RetryHistory<T, E> {
        trace_finish(&history, &self.policy);
        history
    }
}

/// Retry `operation` for up to `timeout` with the default 200ms delay.
///
/// Shorthand for [`Retry::run`] on the system clock. `Duration::MAX` retries
/// until success.
///
/// # Examples
///
/// ```rust
/// use mulligan::retry_for;
/// use std::time::Duration;
///
/// let history = retry_for(Duration::from_secs(1), || Ok::<_, String>("ready"));
///
/// assert!(history.is_completed_successfully());
/// assert_eq!(history.count(), 1);
/// ```
pub fn retry_for<T, E, F>(timeout: Duration, operation: F) -> RetryHistory<T, E>
where
    F: FnMut() -> Result<T, E>,
{
    default_engine(timeout).run(operation)
}

/// Retry `operation` for up to `timeout` while `keep_retrying` answers `true`.
///
/// Shorthand for [`Retry::run_while`] on the system clock with the default
/// 200ms delay.
pub fn retry_while<T, E, F, P>(
    timeout: Duration,
    operation: F,
    keep_retrying: P,
) -> RetryHistory<T, E>
where
    F: FnMut() -> Result<T, E>,
    P: FnMut(&T) -> bool,
{
    default_engine(timeout).run_while(operation, keep_retrying)
}

fn default_engine(timeout: Duration) -> Retry<SystemClock> {
    // The default delay is non-zero, so any timeout validates.
    Retry {
        policy: RetryPolicy::new(timeout),
        clock: SystemClock,
        cancellation: None,
    }
}

#[cfg(feature = "tracing")]
fn trace_retry<T, E>(attempt: &Attempt<T, E>, number: usize, elapsed: Duration, delay: Duration) {
    if attempt.is_faulted() {
        tracing::debug!(attempt = number, ?elapsed, ?delay, "attempt failed, retrying");
    } else {
        tracing::debug!(attempt = number, ?elapsed, ?delay, "retry requested by predicate");
    }
}

#[cfg(not(feature = "tracing"))]
fn trace_retry<T, E>(
    _attempt: &Attempt<T, E>,
    _number: usize,
    _elapsed: Duration,
    _delay: Duration,
) {
}

#[cfg(feature = "tracing")]
fn trace_finish<T, E>(history: &RetryHistory<T, E>, policy: &RetryPolicy) {
    let attempts = history.count();
    let elapsed = history.elapsed();
    if history.is_completed_successfully() {
        tracing::info!(attempts, ?elapsed, "operation succeeded");
    } else if history.is_canceled() {
        tracing::debug!(attempts, ?elapsed, "retry canceled");
    } else {
        tracing::warn!(
            attempts,
            ?elapsed,
            timeout = ?policy.timeout(),
            "retry timed out"
        );
    }
}

#[cfg(not(feature = "tracing"))]
fn trace_finish<T, E>(_history: &RetryHistory<T, E>, _policy: &RetryPolicy) {}

#[cfg(test)]
mod engine_tests {
    use super::*;
    use crate::testing::ManualClock;

    fn engine(timeout: Duration) -> Retry<ManualClock> {
        Retry::new(RetryPolicy::new(timeout))
            .unwrap()
            .with_clock(ManualClock::new())
    }

    #[test]
    fn test_first_attempt_success_does_not_sleep() {
        let retry = engine(Duration::from_secs(1));
        let history = retry.run(|| Ok::<_, ()>(1));

        assert_eq!(history.count(), 1);
        assert!(retry.clock().sleeps().is_empty());
    }

    #[test]
    fn test_sleeps_policy_delay_between_attempts() {
        let policy = RetryPolicy::new(Duration::from_secs(1)).with_delay(Duration::from_millis(75));
        let retry = Retry::new(policy)
            .unwrap()
            .with_clock(ManualClock::new());

        let mut calls = 0;
        let history = retry.run(|| {
            calls += 1;
            if calls < 3 {
                Err(calls)
            } else {
                Ok(())
            }
        });

        assert_eq!(history.count(), 3);
        assert_eq!(retry.clock().sleeps(), vec![Duration::from_millis(75); 2]);
    }

    #[test]
    fn test_timeout_checked_after_failure() {
        let retry = engine(Duration::from_millis(500));
        let history = retry.run(|| Err::<(), _>("down"));

        // Attempts start at 0, 200, 400 and 600ms; the check after the 600ms
        // attempt is the first to see the window used up.
        assert_eq!(history.count(), 4);
        assert!(!history.is_completed_successfully());
        assert!(!history.is_canceled());
        assert_eq!(history.last_attempt().error(), Some(&"down"));
    }

    #[test]
    fn test_zero_timeout_makes_single_attempt() {
        let retry = engine(Duration::ZERO);
        let history = retry.run(|| Err::<(), _>("down"));
        assert_eq!(history.count(), 1);
    }

    #[test]
    fn test_success_ignores_expired_timeout() {
        let clock = ManualClock::new();
        let retry = engine(Duration::from_millis(100)).with_clock(clock.clone());

        let history = retry.run(|| {
            clock.advance(Duration::from_secs(5));
            Ok::<_, ()>("slow but fine")
        });

        assert!(history.is_completed_successfully());
        assert_eq!(history.total_duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_predicate_not_consulted_for_errors() {
        let retry = engine(Duration::from_secs(1));
        let mut calls = 0;
        let mut consulted = Vec::new();

        let history = retry.run_while(
            || {
                calls += 1;
                if calls % 2 == 1 {
                    Err("odd")
                } else {
                    Ok(calls)
                }
            },
            |v| {
                consulted.push(*v);
                *v < 4
            },
        );

        assert!(history.is_completed_successfully());
        assert_eq!(history.count(), 4);
        assert_eq!(consulted, vec![2, 4]);
    }

    #[test]
    fn test_canceled_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let retry = engine(Duration::from_secs(1)).with_cancellation(token);

        let mut calls = 0;
        let history = retry.run(|| {
            calls += 1;
            Ok::<_, ()>(())
        });

        assert_eq!(calls, 0);
        assert_eq!(history.count(), 1);
        assert!(history.is_canceled());
        assert!(!history.is_completed_successfully());
        assert_eq!(history.last_attempt().failure(), Some(&Failure::Canceled(None)));
    }

    #[test]
    fn test_cancel_during_successful_attempt_still_succeeds() {
        let token = CancellationToken::new();
        let retry = engine(Duration::from_secs(1)).with_cancellation(token.clone());

        let history = retry.run(|| {
            token.cancel();
            Ok::<_, ()>(9)
        });

        assert!(history.is_completed_successfully());
        assert!(!history.is_canceled());
    }

    #[test]
    fn test_cancel_during_predicate_retry_keeps_value() {
        let token = CancellationToken::new();
        let retry = engine(Duration::from_secs(1)).with_cancellation(token.clone());

        let history = retry.run_while(
            || {
                token.cancel();
                Ok::<_, ()>(3)
            },
            |v| *v != 5,
        );

        assert_eq!(history.count(), 1);
        assert!(history.is_canceled());
        assert_eq!(history.value(), Some(&3));
        assert!(!history.last_attempt().is_faulted());
    }

    #[test]
    fn test_infinite_timeout_keeps_going() {
        let retry = Retry::new(RetryPolicy::forever().with_delay(Duration::from_secs(3600)))
            .unwrap()
            .with_clock(ManualClock::new());

        let mut calls = 0;
        let history = retry.run(|| {
            calls += 1;
            if calls < 50 {
                Err("still down")
            } else {
                Ok(calls)
            }
        });

        assert_eq!(history.count(), 50);
        assert!(history.is_completed_successfully());
        assert_eq!(history.elapsed(), Duration::from_secs(3600 * 49));
    }

    #[test]
    fn test_new_rejects_unbounded_spin() {
        let result = Retry::new(RetryPolicy::forever().with_delay(Duration::ZERO));
        assert_eq!(result.unwrap_err(), RetryConfigError::UnboundedSpin);
    }

    #[test]
    fn test_default_engine_policy() {
        let retry = Retry::default();
        assert_eq!(retry.policy(), &RetryPolicy::default());
    }
}
