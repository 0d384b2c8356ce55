//! Retry policy values and presets.

use std::time::Duration;

/// How many times to try an operation and how long to wait in between.
///
/// Policies are plain immutable values. The presets are constants so nothing
/// can mutate them at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound on any computed delay (before jitter)
    pub max_delay: Duration,
    /// Growth factor applied per attempt
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Three attempts, 1s doubling up to 30s
    pub const DEFAULT: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
        backoff_multiplier: 2.0,
    };

    /// More attempts with shorter, slower-growing delays
    pub const AGGRESSIVE: RetryPolicy = RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(500),
        max_delay: Duration::from_secs(10),
        backoff_multiplier: 1.5,
    };

    /// Few attempts with long, fast-growing delays
    pub const CONSERVATIVE: RetryPolicy = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(60),
        backoff_multiplier: 3.0,
    };

    /// Look up a preset by name (`default`, `aggressive`, `conservative`)
    #[must_use]
    pub fn preset(name: &str) -> Option<RetryPolicy> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::DEFAULT),
            "aggressive" => Some(Self::AGGRESSIVE),
            "conservative" => Some(Self::CONSERVATIVE),
            _ => None,
        }
    }

    /// Exponential delay after the given 0-based attempt, without jitter:
    /// `min(max_delay, base_delay * backoff_multiplier^attempt)`
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        if !seconds.is_finite() || seconds >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_backoff_doubles() {
        let policy = RetryPolicy::DEFAULT;
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_respects_max_delay() {
        let policy = RetryPolicy::DEFAULT;
        assert_eq!(policy.backoff(10), Duration::from_secs(30));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_presets_by_name() {
        assert_eq!(RetryPolicy::preset("Aggressive"), Some(RetryPolicy::AGGRESSIVE));
        assert_eq!(RetryPolicy::preset(" conservative "), Some(RetryPolicy::CONSERVATIVE));
        assert_eq!(RetryPolicy::preset("default"), Some(RetryPolicy::default()));
        assert_eq!(RetryPolicy::preset("reckless"), None);
    }

    proptest! {
        #[test]
        fn prop_backoff_bounded_and_monotonic(
            base_ms in 1u64..5_000,
            max_ms in 1u64..120_000,
            multiplier in 1.0f64..4.0,
            attempt in 0u32..64,
        ) {
            let policy = RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_millis(base_ms),
                max_delay: Duration::from_millis(max_ms),
                backoff_multiplier: multiplier,
            };
            let current = policy.backoff(attempt);
            prop_assert!(current <= policy.max_delay);
            prop_assert!(policy.backoff(attempt + 1) >= current);
        }
    }
}
