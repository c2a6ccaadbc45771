//! Time source used by the retry engine.

#[cfg(feature = "async")]
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Wall-clock reads and sleeps, injected into [`Retry`](crate::Retry).
///
/// The engine never touches the system clock directly, so tests can swap in
/// [`ManualClock`](crate::testing::ManualClock) and run without real waits.
/// This holds for the async loop too: its delays go through
/// [`sleep_async`](Self::sleep_async), never straight to `tokio`.
pub trait Clock {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Wait for `duration` without blocking the executor.
    ///
    /// Defaults to `tokio::time::sleep`. Clocks that keep virtual time must
    /// override it so the async loop advances them.
    #[cfg(feature = "async")]
    fn sleep_async(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// The real clock: `SystemTime::now`, `std::thread::sleep` and
/// `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> SystemTime {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }

    #[cfg(feature = "async")]
    fn sleep_async(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        (**self).sleep_async(duration)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> SystemTime {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }

    #[cfg(feature = "async")]
    fn sleep_async(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        (**self).sleep_async(duration)
    }
}

/// Time elapsed between two clock readings, zero if `later` is earlier.
pub(crate) fn span(earlier: SystemTime, later: SystemTime) -> Duration {
    later.duration_since(earlier).unwrap_or(Duration::ZERO)
}
