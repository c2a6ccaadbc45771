//! Retrying an async operation on tokio
//!
//! Run with: cargo run --example async_retry --features async

use mulligan::{Retry, RetryPolicy};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let policy = RetryPolicy::new(Duration::from_secs(1)).with_delay(Duration::from_millis(50));
    let retry = Retry::new(policy).expect("valid policy");

    let mut calls = 0;
    let history = retry
        .run_async(|| {
            calls += 1;
            let call = calls;
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if call < 3 {
                    Err(format!("handshake {} refused", call))
                } else {
                    Ok(call)
                }
            }
        })
        .await;

    for attempt in history.attempts() {
        println!(
            "{:>4?} -> value {:?}, error {:?}",
            attempt.duration(),
            attempt.value(),
            attempt.error()
        );
    }
    println!("succeeded: {}", history.is_completed_successfully());
}
