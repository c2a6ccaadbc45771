//! Retry patterns and the history they produce
//!
//! Run with: cargo run --example retry_history

use mulligan::{CancellationToken, Retry, RetryPolicy};
use std::time::Duration;

fn main() {
    println!("=== Retry History Examples ===\n");

    flaky_connection();
    poll_until_ready();
    give_up_on_timeout();
    cancel_from_elsewhere();
}

fn flaky_connection() {
    println!("--- Flaky connection ---");

    let policy = RetryPolicy::new(Duration::from_secs(2)).with_delay(Duration::from_millis(50));
    let retry = Retry::new(policy).expect("valid policy");

    let mut attempts_left = 3;
    let history = retry.run(|| {
        attempts_left -= 1;
        if attempts_left > 0 {
            Err("connection reset by peer")
        } else {
            Ok("connected")
        }
    });

    for (i, attempt) in history.attempts().enumerate() {
        match attempt.failure() {
            Some(failure) => println!("  attempt {}: failed ({})", i + 1, failure),
            None => println!("  attempt {}: {:?}", i + 1, attempt.value()),
        }
    }
    println!(
        "  success: {}, attempts: {}, time in operation: {:?}\n",
        history.is_completed_successfully(),
        history.count(),
        history.total_duration()
    );
}

fn poll_until_ready() {
    println!("--- Poll until a job reports done ---");

    let policy = RetryPolicy::new(Duration::from_secs(2)).with_delay(Duration::from_millis(20));
    let retry = Retry::new(policy).expect("valid policy");

    let mut progress = 0;
    let history = retry.run_while(
        || {
            progress += 25;
            Ok::<_, String>(progress)
        },
        |percent| *percent < 100,
    );

    let seen: Vec<_> = history.attempts().filter_map(|a| a.value()).collect();
    println!("  progress readings: {:?}", seen);
    println!("  predicate retries: {}\n", history.failures().count());
}

fn give_up_on_timeout() {
    println!("--- Give up after the timeout ---");

    let policy =
        RetryPolicy::new(Duration::from_millis(300)).with_delay(Duration::from_millis(100));
    let retry = Retry::new(policy).expect("valid policy");

    let history = retry.run(|| Err::<(), _>("dns lookup failed"));

    match history.into_result() {
        Ok(()) => println!("  unexpected success\n"),
        Err(exhausted) => println!("  {}\n", exhausted),
    }
}

fn cancel_from_elsewhere() {
    println!("--- Cancel from another thread ---");

    let token = CancellationToken::new();
    let retry = Retry::new(RetryPolicy::forever().with_delay(Duration::from_millis(25)))
        .expect("valid policy")
        .with_cancellation(token.clone());

    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        token.cancel();
    });

    let history = retry.run(|| Err::<(), _>("lock held by another process"));
    canceller.join().expect("canceller thread");

    println!(
        "  canceled: {}, attempts before stopping: {}",
        history.is_canceled(),
        history.count()
    );
}
