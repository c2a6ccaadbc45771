//! Retry policy types and configuration.

use std::time::Duration;

use super::error::RetryConfigError;

/// Delay between attempts when none is configured.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

/// Total retry window used by [`RetryPolicy::default`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// How long to keep retrying and how long to wait between attempts.
///
/// Policies are pure data: they describe retry behavior but don't execute it.
/// The timeout is measured from the start of the first attempt and is only
/// checked after an attempt that failed, so at least one attempt always runs.
///
/// # Examples
///
/// ```rust
/// use mulligan::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(Duration::from_secs(5))
///     .with_delay(Duration::from_millis(50));
///
/// assert_eq!(policy.timeout(), Some(Duration::from_secs(5)));
/// assert_eq!(policy.delay(), Duration::from_millis(50));
///
/// // Duration::MAX is the "never time out" sentinel
/// assert!(RetryPolicy::new(Duration::MAX).is_infinite());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    timeout: Option<Duration>,
    #[cfg_attr(feature = "serde", serde(default = "default_delay"))]
    delay: Duration,
}

#[cfg(feature = "serde")]
fn default_delay() -> Duration {
    DEFAULT_DELAY
}

impl RetryPolicy {
    /// Retry for up to `timeout`. `Duration::MAX` disables the timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout: (timeout != Duration::MAX).then_some(timeout),
            delay: DEFAULT_DELAY,
        }
    }

    /// Retry until success or cancellation, however long that takes.
    pub fn forever() -> Self {
        Self {
            timeout: None,
            delay: DEFAULT_DELAY,
        }
    }

    /// Set the delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The retry window, `None` when infinite.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The delay between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether the timeout check is disabled.
    pub fn is_infinite(&self) -> bool {
        self.timeout.is_none()
    }

    /// Whether `elapsed` has used up the retry window.
    pub fn is_expired(&self, elapsed: Duration) -> bool {
        match self.timeout {
            Some(limit) => elapsed >= limit,
            None => false,
        }
    }

    /// Reject configurations the engine refuses to run.
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if self.is_infinite() && self.delay.is_zero() {
            Err(RetryConfigError::UnboundedSpin)
        } else {
            Ok(())
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.timeout(), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_max_duration_is_infinite() {
        let policy = RetryPolicy::new(Duration::MAX);
        assert!(policy.is_infinite());
        assert_eq!(policy, RetryPolicy::forever());
    }

    #[test]
    fn test_is_expired() {
        let policy = RetryPolicy::new(Duration::from_millis(500));
        assert!(!policy.is_expired(Duration::from_millis(499)));
        assert!(policy.is_expired(Duration::from_millis(500)));
        assert!(policy.is_expired(Duration::from_secs(3)));
    }

    #[test]
    fn test_infinite_never_expires() {
        assert!(!RetryPolicy::forever().is_expired(Duration::from_secs(u32::MAX as u64)));
    }

    #[test]
    fn test_zero_timeout_expires_immediately() {
        assert!(RetryPolicy::new(Duration::ZERO).is_expired(Duration::ZERO));
    }

    #[test]
    fn test_validate_rejects_unbounded_spin() {
        let policy = RetryPolicy::forever().with_delay(Duration::ZERO);
        assert_eq!(policy.validate(), Err(RetryConfigError::UnboundedSpin));
    }

    #[test]
    fn test_validate_accepts_bounded_zero_delay() {
        let policy = RetryPolicy::new(Duration::from_millis(10)).with_delay(Duration::ZERO);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_forever_with_delay() {
        assert!(RetryPolicy::forever().validate().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_policy_from_json() {
        let json = r#"{"timeout":{"secs":2,"nanos":0}}"#;
        let policy: RetryPolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.timeout(), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay(), DEFAULT_DELAY);

        let forever: RetryPolicy =
            serde_json::from_str(r#"{"timeout":null,"delay":{"secs":0,"nanos":5000000}}"#).unwrap();
        assert!(forever.is_infinite());
        assert_eq!(forever.delay(), Duration::from_millis(5));
    }
}
