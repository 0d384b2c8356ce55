//! Timeout + circuit breaker + retry, composed into one call path.

mod batch;

pub use batch::{BatchResult, OperationResult};

use super::circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats};
use super::retry::{RetryExecutor, RetryPolicy};
use crate::sync::CancellationSignal;
use crate::tracing::{batch_span, remote_call_span};
use pipewright_core::constants::DEFAULT_REQUEST_TIMEOUT;
use pipewright_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn, Instrument};

/// Resilient access to one logical remote endpoint.
///
/// Owns that endpoint's circuit breaker. A whole retried sequence counts as a
/// single breaker outcome, so three attempts against a flaky endpoint do not
/// trip the breaker three times as fast.
#[derive(Debug)]
pub struct ResilientExecutor {
    breaker: CircuitBreaker,
    retry: RetryExecutor,
    default_policy: RetryPolicy,
    default_timeout: Duration,
}

impl ResilientExecutor {
    pub fn new(name: impl Into<String>, breaker_config: CircuitBreakerConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(name, breaker_config),
            retry: RetryExecutor::new(),
            default_policy: RetryPolicy::DEFAULT,
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Policy used when a call does not pass its own
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Deadline used when a call does not pass its own
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry_executor(mut self, retry: RetryExecutor) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.breaker.name()
    }

    #[must_use]
    pub fn default_policy(&self) -> &RetryPolicy {
        &self.default_policy
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `operation` with retries, under a deadline, through the breaker.
    ///
    /// The deadline (default 30s) bounds all attempts and backoff sleeps
    /// together and surfaces as [`Error::Timeout`]. Caller cancellation
    /// surfaces as [`Error::Cancelled`] and is not held against the breaker.
    pub async fn execute_resilient<F, Fut, T>(
        &self,
        operation: F,
        policy: Option<&RetryPolicy>,
        timeout: Option<Duration>,
        cancel: &CancellationSignal,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let policy = policy.unwrap_or(&self.default_policy);
        let deadline = timeout.unwrap_or(self.default_timeout);
        let name = self.breaker.name();

        self.breaker
            .execute(|| async move {
                match tokio::time::timeout(
                    deadline,
                    self.retry.execute_with_retry(operation, policy, cancel),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(endpoint = %name, deadline = ?deadline, "resilient call hit its deadline");
                        Err(Error::timeout(name, deadline))
                    }
                }
            })
            .instrument(remote_call_span(name))
            .await
    }

    /// Run `operation` once per input, strictly one after another.
    ///
    /// Items never run concurrently: a single half-open probe window and the
    /// remote's rate-limit accounting both assume calls arrive in sequence.
    /// With `continue_on_failure` false the batch stops at the first failed
    /// item and returns what it has so far. Cancellation aborts the batch and
    /// is returned as the error.
    pub async fn execute_batch<I, F, Fut, T>(
        &self,
        inputs: impl IntoIterator<Item = I>,
        mut operation: F,
        continue_on_failure: bool,
        cancel: &CancellationSignal,
    ) -> Result<BatchResult<I, T>>
    where
        F: FnMut(&I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let inputs: Vec<I> = inputs.into_iter().collect();
        let span = batch_span(self.name(), inputs.len());
        let mut batch = BatchResult::with_capacity(inputs.len());

        async {
            for input in inputs {
                let outcome = self
                    .execute_resilient(|| operation(&input), None, None, cancel)
                    .await;

                if let Err(error) = &outcome {
                    if error.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    debug!(error = %error, "batch item failed");
                }

                let failed = outcome.is_err();
                batch.push(OperationResult::new(input, outcome));

                if failed && !continue_on_failure {
                    debug!(completed = batch.len(), "stopping batch at first failure");
                    break;
                }
            }
            Ok(())
        }
        .instrument(span)
        .await?;

        Ok(batch)
    }

    /// Snapshot of this endpoint's circuit breaker
    #[must_use]
    pub fn circuit_breaker_stats(&self) -> CircuitBreakerStats {
        self.breaker.stats()
    }

    /// Force this endpoint's circuit breaker closed
    pub fn reset_circuit_breaker(&self) {
        self.breaker.reset();
    }

    #[must_use]
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit::CircuitState;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 1.0,
        }
    }

    fn executor(threshold: u32) -> ResilientExecutor {
        ResilientExecutor::new(
            "projects-api",
            CircuitBreakerConfig::new(threshold, Duration::from_secs(1)),
        )
        .with_retry_policy(quick_policy())
        .with_retry_executor(RetryExecutor::new().with_max_jitter(Duration::ZERO))
    }

    #[tokio::test(start_paused = true)]
    async fn test_retried_sequence_counts_once_against_breaker() {
        let executor = executor(2);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<()> = executor
            .execute_resilient(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(Error::http(503, "down")) }
                },
                None,
                None,
                &CancellationSignal::never(),
            )
            .await;

        assert!(matches!(result, Err(Error::ExhaustedRetries { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let stats = executor.circuit_breaker_stats();
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.state, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_the_whole_sequence() {
        let executor = executor(5).with_retry_policy(RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 1.0,
        });
        let started = Instant::now();

        let result: Result<()> = executor
            .execute_resilient(
                || async { Err(Error::network("gitlab.example.com", "reset")) },
                None,
                Some(Duration::from_secs(15)),
                &CancellationSignal::never(),
            )
            .await;

        match result {
            Err(Error::Timeout { operation, duration }) => {
                assert_eq!(operation, "projects-api");
                assert_eq!(duration, Duration::from_secs(15));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(16));
        assert_eq!(executor.circuit_breaker_stats().failure_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_propagates_unchanged() {
        let executor = executor(1);
        let cancel = CancellationSignal::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result: Result<()> = executor
            .execute_resilient(
                || async { Err(Error::network("gitlab.example.com", "reset")) },
                None,
                None,
                &cancel,
            )
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        let stats = executor.circuit_breaker_stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_fails_fast_without_invoking() {
        let executor = executor(1);
        let calls = Arc::new(AtomicU32::new(0));

        let _: Result<()> = executor
            .execute_resilient(
                || async { Err(Error::http(401, "token expired")) },
                None,
                None,
                &CancellationSignal::never(),
            )
            .await;
        assert_eq!(executor.circuit_breaker_stats().state, CircuitState::Open);

        let counter = calls.clone();
        let result = executor
            .execute_resilient(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                None,
                None,
                &CancellationSignal::never(),
            )
            .await;
        assert!(matches!(result, Err(Error::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        executor.reset_circuit_breaker();
        assert_eq!(executor.circuit_breaker_stats().state, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_continues_past_failures_in_order() {
        let executor = executor(5);

        let batch = executor
            .execute_batch(
                vec!["a", "b", "c"],
                |item: &&str| {
                    let item = *item;
                    async move {
                        if item == "b" {
                            Err(Error::http(404, "project not found"))
                        } else {
                            Ok(item.to_uppercase())
                        }
                    }
                },
                true,
                &CancellationSignal::never(),
            )
            .await
            .unwrap();

        assert_eq!(batch.success_count(), 2);
        assert_eq!(batch.failure_count(), 1);
        let inputs: Vec<_> = batch.results().iter().map(|r| *r.input()).collect();
        assert_eq!(inputs, vec!["a", "b", "c"]);
        assert_eq!(batch.results()[0].result().map(String::as_str), Some("A"));
        assert!(!batch.results()[1].is_success());
        assert_eq!(batch.results()[2].result().map(String::as_str), Some("C"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_stops_at_first_failure() {
        let executor = executor(5);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let batch = executor
            .execute_batch(
                1..=4u32,
                move |n: &u32| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let n = *n;
                    async move {
                        if n == 2 {
                            Err(Error::http(403, "forbidden"))
                        } else {
                            Ok(n * 10)
                        }
                    }
                },
                false,
                &CancellationSignal::never(),
            )
            .await
            .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.success_count(), 1);
        assert_eq!(batch.failure_count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_runs_items_sequentially() {
        let executor = executor(5);
        let in_flight = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let (active, peak) = (in_flight.clone(), max_seen.clone());
        let batch = executor
            .execute_batch(
                0..5u32,
                move |_: &u32| {
                    let (active, peak) = (active.clone(), peak.clone());
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
                true,
                &CancellationSignal::never(),
            )
            .await
            .unwrap();

        assert!(batch.all_succeeded());
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_propagates_cancellation() {
        let executor = executor(5);
        let cancel = CancellationSignal::new();
        cancel.cancel();

        let result = executor
            .execute_batch(
                vec![1, 2],
                |_: &i32| async { Ok(()) },
                true,
                &cancel,
            )
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
