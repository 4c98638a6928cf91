//! Backoff Policy
//!
//! Delay schedule used by the Redis adapter between reconnect attempts.

use std::time::Duration;

/// Bounded exponential backoff.
///
/// The delay before attempt `n` (1-based) is `base * multiplier^(n-1)`,
/// capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub base: Duration,
    /// Growth factor applied per attempt
    pub multiplier: f64,
    /// Upper bound for any single delay
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, multiplier: f64, max: Duration) -> Self {
        Self {
            base,
            multiplier,
            max,
        }
    }

    /// Delay to wait after `attempt` consecutive failures.
    ///
    /// Attempt 0 is treated as attempt 1. A multiplier below 1.0 is clamped
    /// to 1.0 so delays never shrink.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = self.base.as_millis() as f64 * factor;

        if !millis.is_finite() || millis >= self.max.as_millis() as f64 {
            return self.max;
        }
        Duration::from_millis(millis as u64).min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(50),
            multiplier: 2.0,
            max: Duration::from_millis(2000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_millis(50));
        assert_eq!(policy.delay(2), Duration::from_millis(100));
        assert_eq!(policy.delay(3), Duration::from_millis(200));
        assert_eq!(policy.delay(6), Duration::from_millis(1600));
        assert_eq!(policy.delay(7), Duration::from_millis(2000));
    }

    #[test]
    fn test_attempt_zero_is_first_attempt() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), policy.delay(1));
    }

    #[test]
    fn test_delay_never_exceeds_cap() {
        let policy = BackoffPolicy::new(Duration::from_millis(10), 10.0, Duration::from_secs(1));
        for attempt in 0..200 {
            assert!(policy.delay(attempt) <= Duration::from_secs(1));
        }
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_multiplier_below_one_is_constant() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), 0.5, Duration::from_secs(5));
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(5), Duration::from_millis(100));
    }
}
