//! Demonstrates tracing output from the retry loop
//!
//! Run with: cargo run --example tracing_demo --features tracing

use mulligan::{Retry, RetryPolicy};
use std::time::Duration;

fn main() {
    // Set up tracing subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    tracing::info!("Starting tracing demo");

    let policy = RetryPolicy::new(Duration::from_secs(1)).with_delay(Duration::from_millis(50));
    let retry = Retry::new(policy).expect("valid policy");

    let mut calls = 0;
    let history = retry.run_while(
        || {
            calls += 1;
            if calls == 1 {
                Err("cache cold")
            } else {
                Ok(calls)
            }
        },
        |generation| *generation < 3,
    );
    tracing::info!(attempts = history.count(), "polling finished");

    let policy = RetryPolicy::new(Duration::from_millis(200)).with_delay(Duration::from_millis(50));
    let retry = Retry::new(policy).expect("valid policy");
    let history = retry.run(|| Err::<(), _>("upstream down"));
    tracing::info!(attempts = history.count(), "gave up");
}
