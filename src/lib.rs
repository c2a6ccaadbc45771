//! # Mulligan
//!
//! > *"Take it again."*
//!
//! A small Rust library for retrying an operation until it succeeds, its time
//! runs out, or it is canceled, and handing back the complete history of
//! every attempt.
//!
//! ## Philosophy
//!
//! - A failed retry sequence is not an exception. The engine always returns a
//!   [`RetryHistory`]; the caller decides what an unsuccessful ending means.
//! - Every attempt is recorded with its timing, value and failure, so the
//!   history can answer "how many tries?", "how long?" and "what went wrong?"
//!   after the fact.
//! - Time is injected. Tests swap in [`testing::ManualClock`] and never sleep.
//!
//! ## Quick Example
//!
//! ```rust
//! use mulligan::retry_while;
//! use std::time::Duration;
//!
//! let mut jobs_remaining = vec![0, 1, 3];
//!
//! // Poll until the queue is drained, for at most one second.
//! let history = retry_while(
//!     Duration::from_secs(1),
//!     || jobs_remaining.pop().ok_or("queue unavailable"),
//!     |remaining| *remaining > 0,
//! );
//!
//! match history.success_attempt() {
//!     Some(attempt) => println!("drained after {:?}", attempt.finish()),
//!     None => println!("gave up after {} attempts", history.count()),
//! }
//! ```
//!
//! ## Features
//!
//! - `async`: `Retry::run_async` / `Retry::run_while_async` on `tokio`
//! - `tracing`: attempt and outcome events through `tracing`
//! - `serde`: `Serialize` for histories, `Serialize + Deserialize` for policies

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod retry;
pub mod testing;

// Re-exports
pub use retry::{
    retry_for, retry_while, Attempt, CancellationToken, Clock, Failure, Retry, RetryConfigError,
    RetryExhausted, RetryHistory, RetryPolicy, SystemClock,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::retry::{
        retry_for, retry_while, Attempt, CancellationToken, Failure, Retry, RetryHistory,
        RetryPolicy,
    };
}
