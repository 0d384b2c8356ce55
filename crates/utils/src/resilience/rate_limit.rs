//! Rate-limit pacing from the remote's quota headers.

use crate::sync::CancellationSignal;
use pipewright_core::constants::{
    MAX_RATE_LIMIT_WAIT, RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER,
    RATE_LIMIT_RESET_HEADER, RATE_LIMIT_RESET_MARGIN, X_RATE_LIMIT_PREFIX,
};
use pipewright_core::{Error, RateLimitInfo, Result};
use std::time::Duration;
use tracing::{debug, info};

/// Computes how long to pause before the next request
#[derive(Debug, Clone)]
pub struct RateLimiter {
    reset_margin: Duration,
    max_wait: Duration,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reset_margin: RATE_LIMIT_RESET_MARGIN,
            max_wait: MAX_RATE_LIMIT_WAIT,
        }
    }

    /// Override the upper bound on a single pause
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Parse quota metadata from response headers.
    ///
    /// Header names match case-insensitively, with or without the `X-` prefix.
    /// Missing or unparsable values become zero; this never fails.
    pub fn extract<I, K, V>(headers: I) -> RateLimitInfo
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut info = RateLimitInfo::default();

        for (name, value) in headers {
            let name = name.as_ref().trim();
            let name = strip_prefix_ignore_case(name, X_RATE_LIMIT_PREFIX).unwrap_or(name);
            let value = value.as_ref().trim();

            if name.eq_ignore_ascii_case(RATE_LIMIT_LIMIT_HEADER) {
                info.limit = value.parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case(RATE_LIMIT_REMAINING_HEADER) {
                info.remaining = value.parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case(RATE_LIMIT_RESET_HEADER) {
                info.reset_time = value.parse().unwrap_or(0);
            }
        }

        info
    }

    /// Pause needed before the next request, measured against the current time
    #[must_use]
    pub fn wait_for(&self, info: &RateLimitInfo) -> Duration {
        self.wait_for_at(info, chrono::Utc::now().timestamp())
    }

    /// Pause needed before the next request at `now` (epoch seconds).
    ///
    /// Zero while quota remains. Otherwise the time until the reported reset
    /// plus a safety margin, never negative and never above the cap.
    #[must_use]
    pub fn wait_for_at(&self, info: &RateLimitInfo, now: i64) -> Duration {
        if info.remaining > 0 {
            return Duration::ZERO;
        }

        let margin = i64::try_from(self.reset_margin.as_secs()).unwrap_or(i64::MAX);
        let seconds = info.reset_time.saturating_sub(now).saturating_add(margin);
        if seconds <= 0 {
            return Duration::ZERO;
        }

        Duration::from_secs(seconds.unsigned_abs()).min(self.max_wait)
    }

    /// Sleep for [`wait_for`](Self::wait_for), waking early with
    /// [`Error::Cancelled`] if the caller cancels.
    pub async fn throttle(&self, info: &RateLimitInfo, cancel: &CancellationSignal) -> Result<()> {
        let wait = self.wait_for(info);
        if wait.is_zero() {
            debug!(remaining = info.remaining, "rate limit quota available");
            return Ok(());
        }

        info!(wait = ?wait, quota = %info, "rate limit exhausted, pausing");
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            () = tokio::time::sleep(wait) => Ok(()),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_extract_all_fields() {
        let headers = [
            ("RateLimit-Limit", "600"),
            ("RateLimit-Remaining", "17"),
            ("RateLimit-Reset", "1700000060"),
            ("Content-Type", "application/json"),
        ];
        let info = RateLimiter::extract(headers);
        assert_eq!(info, RateLimitInfo::new(600, 17, 1_700_000_060));
    }

    #[test]
    fn test_extract_is_case_insensitive_and_accepts_x_prefix() {
        let mut headers = HashMap::new();
        headers.insert("x-ratelimit-limit".to_string(), " 100 ".to_string());
        headers.insert("X-RATELIMIT-REMAINING".to_string(), "0".to_string());
        headers.insert("ratelimit-reset".to_string(), "42".to_string());

        let info = RateLimiter::extract(&headers);
        assert_eq!(info, RateLimitInfo::new(100, 0, 42));
    }

    #[test]
    fn test_extract_defaults_missing_and_garbage_to_zero() {
        let info = RateLimiter::extract([("RateLimit-Limit", "lots"), ("RateLimit-Reset", "")]);
        assert_eq!(info, RateLimitInfo::default());

        let empty: [(&str, &str); 0] = [];
        assert_eq!(RateLimiter::extract(empty), RateLimitInfo::default());
    }

    #[test]
    fn test_wait_is_zero_with_quota_left() {
        let limiter = RateLimiter::new();
        let info = RateLimitInfo::new(100, 1, NOW + 600);
        assert_eq!(limiter.wait_for_at(&info, NOW), Duration::ZERO);
    }

    #[test]
    fn test_wait_until_reset_plus_margin() {
        let limiter = RateLimiter::new();
        let info = RateLimitInfo::new(100, 0, NOW + 30);
        assert_eq!(limiter.wait_for_at(&info, NOW), Duration::from_secs(35));
    }

    #[test]
    fn test_wait_never_negative() {
        let limiter = RateLimiter::new();
        let info = RateLimitInfo::new(100, 0, NOW - 3600);
        assert_eq!(limiter.wait_for_at(&info, NOW), Duration::ZERO);
    }

    #[test]
    fn test_wait_capped_for_far_future_reset() {
        let limiter = RateLimiter::new();
        let info = RateLimitInfo::new(100, 0, NOW + 86_400 * 365);
        assert_eq!(limiter.wait_for_at(&info, NOW), MAX_RATE_LIMIT_WAIT);

        let info = RateLimitInfo::new(100, 0, i64::MAX);
        assert_eq!(limiter.wait_for_at(&info, NOW), MAX_RATE_LIMIT_WAIT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_returns_immediately_with_quota() {
        let limiter = RateLimiter::new();
        let started = tokio::time::Instant::now();
        limiter
            .throttle(&RateLimitInfo::new(10, 5, 0), &CancellationSignal::never())
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_wakes_on_cancel() {
        let limiter = RateLimiter::new();
        let cancel = CancellationSignal::new();
        let info = RateLimitInfo::new(10, 0, chrono::Utc::now().timestamp() + 600);

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let started = tokio::time::Instant::now();
        let result = limiter.throttle(&info, &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    proptest! {
        #[test]
        fn prop_wait_zero_when_quota_remains(remaining in 1u64..10_000, reset in any::<i64>(), now in any::<i64>()) {
            let info = RateLimitInfo::new(10_000, remaining, reset);
            prop_assert_eq!(RateLimiter::new().wait_for_at(&info, now), Duration::ZERO);
        }

        #[test]
        fn prop_wait_never_exceeds_cap(reset in any::<i64>(), now in any::<i64>()) {
            let info = RateLimitInfo::new(100, 0, reset);
            prop_assert!(RateLimiter::new().wait_for_at(&info, now) <= MAX_RATE_LIMIT_WAIT);
        }
    }
}
