//! Retry an operation and keep a record of every attempt.
//!
//! The pieces follow a "pure core, imperative shell" split:
//!
//! - **Pure core**: [`RetryPolicy`] is plain data, and [`RetryHistory`] /
//!   [`Attempt`] are read-only records with derived queries.
//! - **Imperative shell**: [`Retry`] drives the operation, reads the
//!   [`Clock`] and sleeps between attempts.
//!
//! # Quick Start
//!
//! ```rust
//! use mulligan::{Retry, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(Duration::from_secs(2))
//!     .with_delay(Duration::from_millis(10));
//! let retry = Retry::new(policy).unwrap();
//!
//! let mut calls = 0;
//! let history = retry.run(|| {
//!     calls += 1;
//!     if calls < 3 { Err("connection refused") } else { Ok("connected") }
//! });
//!
//! assert!(history.is_completed_successfully());
//! assert_eq!(history.count(), 3);
//! assert_eq!(history.value(), Some(&"connected"));
//! ```
//!
//! # Terminal conditions
//!
//! - **Success**: the operation returned `Ok` and, for
//!   [`Retry::run_while`], the continuation predicate is satisfied.
//! - **Cancellation**: a [`CancellationToken`] was canceled. The final attempt
//!   has `is_canceled() == true` and a [`Failure::Canceled`].
//! - **Timeout**: the policy's window ran out after a failed attempt. There is
//!   no dedicated error; the history simply ends unsuccessful and not canceled.
//!
//! # Error Types
//!
//! - [`RetryConfigError`]: the policy was rejected before any attempt
//! - [`RetryExhausted`]: opt-in conversion of an unsuccessful history with
//!   [`RetryHistory::into_result`]

mod attempt;
mod cancel;
mod clock;
mod engine;
mod error;
mod history;
mod policy;

pub use attempt::{Attempt, Failure};
pub use cancel::CancellationToken;
pub use clock::{Clock, SystemClock};
pub use engine::{retry_for, retry_while, Retry};
pub use error::{RetryConfigError, RetryExhausted};
pub use history::RetryHistory;
pub use policy::{RetryPolicy, DEFAULT_DELAY, DEFAULT_TIMEOUT};
