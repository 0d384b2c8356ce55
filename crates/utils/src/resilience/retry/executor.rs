//! The retry loop.

use super::policy::RetryPolicy;
use crate::resilience::classifier::{ErrorClass, ErrorClassifier};
use crate::resilience::rate_limit::RateLimiter;
use crate::sync::CancellationSignal;
use pipewright_core::constants::{MAX_BACKOFF_JITTER, MAX_RATE_LIMIT_BACKOFF};
use pipewright_core::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs an operation until it succeeds, fails permanently, or runs out of attempts
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_jitter: Duration,
    rate_limiter: RateLimiter,
}

impl RetryExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_jitter: MAX_BACKOFF_JITTER,
            rate_limiter: RateLimiter::new(),
        }
    }

    /// Override the upper bound of the uniform jitter added to generic backoff
    #[must_use]
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Use `rate_limiter` to read quota resets reported with a 429
    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Execute `operation` with retries according to `policy`.
    ///
    /// - success returns immediately;
    /// - a non-retryable error is returned unchanged;
    /// - a retryable error sleeps and tries again, except after the last
    ///   allowed attempt, which yields [`Error::ExhaustedRetries`];
    /// - cancellation wakes any pending sleep or attempt and returns
    ///   [`Error::Cancelled`].
    pub async fn execute_with_retry<F, Fut, T>(
        &self,
        mut operation: F,
        policy: &RetryPolicy,
        cancel: &CancellationSignal,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if policy.max_attempts == 0 {
            return Err(Error::configuration(
                "retry policy must allow at least one attempt",
            ));
        }

        let mut last_error = None;

        for attempt in 0..policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                outcome = operation() => outcome,
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        info!("Operation succeeded after {attempt} retries");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !ErrorClassifier::is_retryable(&error) {
                debug!(error = %error, "not retrying non-retryable error");
                return Err(error);
            }

            if !ErrorClassifier::should_retry(&error, attempt, policy) {
                last_error = Some(error);
                break;
            }

            let delay = self.delay_for(&error, attempt, policy);
            warn!(
                "Operation failed (attempt {}/{}), retrying in {:?}: {}",
                attempt + 1,
                policy.max_attempts,
                delay,
                error
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }

        match last_error {
            Some(error) => {
                warn!(
                    attempts = policy.max_attempts,
                    error = %error,
                    "giving up after exhausting retries"
                );
                Err(Error::exhausted_retries(policy.max_attempts, error))
            }
            None => Err(Error::configuration("retry loop ended without an outcome")),
        }
    }

    /// Delay before the attempt after `attempt` (0-based) failed with `error`.
    ///
    /// Rate-limit failures back off as `min(60s, 2^attempt s)` with no jitter.
    /// When the 429 reported an exhausted quota and its reset time, the delay
    /// stretches towards that reset, still capped at 60s. Everything else uses
    /// the policy's exponential backoff plus uniform jitter.
    #[must_use]
    pub fn delay_for(&self, error: &Error, attempt: u32, policy: &RetryPolicy) -> Duration {
        if ErrorClassifier::classify(error) == ErrorClass::RateLimited {
            let until_reset = error
                .rate_limit()
                .map_or(Duration::ZERO, |info| self.rate_limiter.wait_for(&info));
            return rate_limit_backoff(attempt)
                .max(until_reset)
                .min(MAX_RATE_LIMIT_BACKOFF);
        }
        policy.backoff(attempt) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let millis = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..millis))
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn rate_limit_backoff(attempt: u32) -> Duration {
    2u64.checked_pow(attempt)
        .map(Duration::from_secs)
        .map_or(MAX_RATE_LIMIT_BACKOFF, |delay| delay.min(MAX_RATE_LIMIT_BACKOFF))
}
