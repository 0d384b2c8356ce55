//! Degraded-mode orchestration.

use super::cache::{AnalysisCache, CacheStats};
use crate::resilience::classifier::{ErrorClass, ErrorClassifier};
use crate::sync::CancellationSignal;
use crate::tracing::analysis_span;
use chrono::{DateTime, Utc};
use pipewright_core::constants::DEFAULT_CACHE_TTL;
use pipewright_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// Outcome of [`FallbackOrchestrator::execute_with_fallback`]
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackResult<R> {
    pub result: R,
    pub used_fallback: bool,
    /// Why the primary was abandoned, when it was
    pub reason: Option<String>,
}

/// Outcome of [`FallbackOrchestrator::execute_analysis_with_fallback`].
///
/// A degraded result always says so: `used_fallback` is set and `warnings`
/// explains where the data came from.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult<T> {
    pub result: T,
    pub used_fallback: bool,
    pub used_cached_data: bool,
    pub cached_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
}

impl<T> AnalysisResult<T> {
    fn complete(result: T) -> Self {
        Self {
            result,
            used_fallback: false,
            used_cached_data: false,
            cached_at: None,
            reason: None,
            warnings: Vec::new(),
        }
    }

    /// Whether the result came from a fallback path
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.used_fallback
    }
}

/// Substitutes degraded results when the remote cannot deliver.
///
/// Owns the cache of earlier full analyses. Construct one per analysis kind
/// and share it by reference.
#[derive(Debug)]
pub struct FallbackOrchestrator<T> {
    cache: AnalysisCache<T>,
}

impl<T: Clone> FallbackOrchestrator<T> {
    #[must_use]
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            cache: AnalysisCache::new(cache_ttl),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &AnalysisCache<T> {
        &self.cache
    }

    /// Run `primary`, replacing a fallback-eligible failure with `fallback`.
    ///
    /// Ineligible failures (429, 404, other 4xx, cancellation) are returned
    /// as they are. If the fallback fails too the result is
    /// [`Error::BothFailed`] carrying both causes.
    pub async fn execute_with_fallback<R, P, PFut, B, BFut>(
        &self,
        primary: P,
        fallback: B,
        operation: &str,
        cancel: &CancellationSignal,
    ) -> Result<FallbackResult<R>>
    where
        P: FnOnce() -> PFut,
        PFut: Future<Output = Result<R>>,
        B: FnOnce() -> BFut,
        BFut: Future<Output = Result<R>>,
    {
        let primary_error = match until_cancelled(cancel, primary()).await {
            Ok(result) => {
                return Ok(FallbackResult {
                    result,
                    used_fallback: false,
                    reason: None,
                })
            }
            Err(error) => error,
        };

        if primary_error.is_cancelled() || !ErrorClassifier::should_fallback(&primary_error) {
            return Err(primary_error);
        }

        warn!(
            operation,
            error = %primary_error,
            "primary operation failed, using fallback"
        );

        match until_cancelled(cancel, fallback()).await {
            Ok(result) => Ok(FallbackResult {
                result,
                used_fallback: true,
                reason: Some(primary_error.to_string()),
            }),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(fallback_error) => {
                warn!(operation, error = %fallback_error, "fallback failed as well");
                Err(Error::both_failed(operation, primary_error, fallback_error))
            }
        }
    }

    /// Run a full analysis for `key`, degrading to `partial_op` when the
    /// remote cannot deliver.
    ///
    /// A successful full analysis refreshes the cache entry for `key`. On a
    /// fallback-eligible failure, or a 404 while a fresh snapshot exists,
    /// `partial_op` receives that snapshot (or `None`) and its output is
    /// returned tagged as degraded.
    pub async fn execute_analysis_with_fallback<F, FFut, P, PFut>(
        &self,
        key: &str,
        full_op: F,
        partial_op: P,
        cancel: &CancellationSignal,
    ) -> Result<AnalysisResult<T>>
    where
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<T>>,
        P: FnOnce(Option<T>) -> PFut,
        PFut: Future<Output = Result<T>>,
    {
        async {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let snapshot = self.cache.get(key);

            let error = match until_cancelled(cancel, full_op()).await {
                Ok(result) => {
                    self.cache.insert(key, result.clone());
                    debug!("full analysis succeeded, cache refreshed");
                    return Ok(AnalysisResult::complete(result));
                }
                Err(error) => error,
            };

            if error.is_cancelled() {
                return Err(error);
            }

            let not_found_with_snapshot =
                ErrorClassifier::classify(&error) == ErrorClass::NotFound && snapshot.is_some();
            if !ErrorClassifier::should_fallback(&error) && !not_found_with_snapshot {
                return Err(error);
            }

            let (payload, cached_at) = match snapshot {
                Some(entry) => (Some(entry.payload), Some(entry.cached_at)),
                None => (None, None),
            };
            let reason = error.to_string();

            warn!(
                error = %error,
                cached = cached_at.is_some(),
                "full analysis failed, falling back to degraded analysis"
            );

            let result = match until_cancelled(cancel, partial_op(payload)).await {
                Ok(result) => result,
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(partial_error) => {
                    warn!(error = %partial_error, "degraded analysis failed as well");
                    return Err(Error::both_failed(key, error, partial_error));
                }
            };

            let mut warnings = Vec::with_capacity(2);
            match cached_at {
                Some(at) => warnings.push(format!("Using cached data from {}", at.to_rfc3339())),
                None => warnings.push("No cached data available".to_string()),
            }
            warnings.push(reason.clone());

            info!(cached = cached_at.is_some(), "returning degraded analysis");
            Ok(AnalysisResult {
                result,
                used_fallback: true,
                used_cached_data: cached_at.is_some(),
                cached_at,
                reason: Some(reason),
                warnings,
            })
        }
        .instrument(analysis_span(key))
        .await
    }

    /// Drop the cache entry for `key`, or every entry when `key` is `None`.
    /// Returns how many entries were removed.
    pub fn clear_cache(&self, key: Option<&str>) -> usize {
        match key {
            Some(key) => usize::from(self.cache.remove(key)),
            None => self.cache.clear(),
        }
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl<T: Clone> Default for FallbackOrchestrator<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

async fn until_cancelled<T>(
    cancel: &CancellationSignal,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        outcome = operation => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    type Analysis = Vec<&'static str>;

    fn orchestrator() -> FallbackOrchestrator<Analysis> {
        FallbackOrchestrator::new(Duration::from_secs(3600))
    }

    async fn seed(orchestrator: &FallbackOrchestrator<Analysis>) {
        orchestrator
            .execute_analysis_with_fallback(
                "group/app",
                || async { Ok(vec!["rust", "docker"]) },
                |_| async { Ok(vec![]) },
                &CancellationSignal::never(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_primary_success_is_not_degraded() {
        let result = orchestrator()
            .execute_with_fallback(
                || async { Ok(1) },
                || async { Ok(2) },
                "detect",
                &CancellationSignal::never(),
            )
            .await
            .unwrap();

        assert_eq!(result.result, 1);
        assert!(!result.used_fallback);
        assert!(result.reason.is_none());
    }

    #[tokio::test]
    async fn test_eligible_failure_uses_fallback() {
        let result = orchestrator()
            .execute_with_fallback(
                || async { Err(Error::http(503, "maintenance")) },
                || async { Ok(2) },
                "detect",
                &CancellationSignal::never(),
            )
            .await
            .unwrap();

        assert_eq!(result.result, 2);
        assert!(result.used_fallback);
        assert!(result.reason.unwrap().contains("maintenance"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_degraded() {
        let fallback_ran = AtomicBool::new(false);
        let result = orchestrator()
            .execute_with_fallback(
                || async { Err::<u8, _>(Error::http(429, "slow down")) },
                || async {
                    fallback_ran.store(true, Ordering::SeqCst);
                    Ok(2)
                },
                "detect",
                &CancellationSignal::never(),
            )
            .await;

        assert!(matches!(result, Err(Error::RateLimited { .. })));
        assert!(!fallback_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_both_failing_reports_both() {
        let result = orchestrator()
            .execute_with_fallback(
                || async { Err::<u8, _>(Error::http(500, "boom")) },
                || async { Err(Error::unexpected("no local data")) },
                "detect",
                &CancellationSignal::never(),
            )
            .await;

        match result {
            Err(Error::BothFailed {
                operation,
                primary,
                fallback,
            }) => {
                assert_eq!(operation, "detect");
                assert!(matches!(*primary, Error::Server { status: 500, .. }));
                assert!(matches!(*fallback, Error::Unexpected { .. }));
            }
            other => panic!("expected both-failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_analysis_success_refreshes_cache() {
        let orchestrator = orchestrator();
        seed(&orchestrator).await;

        let stats = orchestrator.cache_stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.fresh_entries, 1);
        assert_eq!(
            orchestrator.cache().get("group/app").map(|entry| entry.payload),
            Some(vec!["rust", "docker"])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_degraded_analysis_uses_fresh_snapshot() {
        let orchestrator = orchestrator();
        seed(&orchestrator).await;
        tokio::time::advance(Duration::from_secs(59 * 60)).await;

        let result = orchestrator
            .execute_analysis_with_fallback(
                "group/app",
                || async { Err(Error::network("gitlab.example.com", "connection reset")) },
                |snapshot| async move {
                    let mut analysis = snapshot.unwrap_or_default();
                    analysis.push("partial");
                    Ok(analysis)
                },
                &CancellationSignal::never(),
            )
            .await
            .unwrap();

        assert!(result.is_degraded());
        assert!(result.used_cached_data);
        assert_eq!(result.result, vec!["rust", "docker", "partial"]);
        let cached_at = result.cached_at.unwrap();
        assert_eq!(
            result.warnings[0],
            format!("Using cached data from {}", cached_at.to_rfc3339())
        );
        assert!(result.warnings[1].contains("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_snapshot_is_not_offered() {
        let orchestrator = orchestrator();
        seed(&orchestrator).await;
        tokio::time::advance(Duration::from_secs(61 * 60)).await;

        let result = orchestrator
            .execute_analysis_with_fallback(
                "group/app",
                || async { Err(Error::http(502, "bad gateway")) },
                |snapshot| async move {
                    assert!(snapshot.is_none());
                    Ok(vec!["partial"])
                },
                &CancellationSignal::never(),
            )
            .await
            .unwrap();

        assert!(result.used_fallback);
        assert!(!result.used_cached_data);
        assert!(result.cached_at.is_none());
        assert_eq!(result.warnings[0], "No cached data available");
        assert_eq!(orchestrator.cache_stats().total_entries, 0);
    }

    #[tokio::test]
    async fn test_not_found_falls_back_only_with_snapshot() {
        let orchestrator = orchestrator();

        let without = orchestrator
            .execute_analysis_with_fallback(
                "group/app",
                || async { Err(Error::http(404, "not found")) },
                |_| async { Ok(vec!["partial"]) },
                &CancellationSignal::never(),
            )
            .await;
        assert!(matches!(without, Err(Error::Client { status: 404, .. })));

        seed(&orchestrator).await;
        let with = orchestrator
            .execute_analysis_with_fallback(
                "group/app",
                || async { Err(Error::http(404, "not found")) },
                |snapshot| async move { Ok(snapshot.unwrap_or_default()) },
                &CancellationSignal::never(),
            )
            .await
            .unwrap();
        assert!(with.used_cached_data);
        assert_eq!(with.result, vec!["rust", "docker"]);
    }

    #[tokio::test]
    async fn test_failing_partial_analysis_reports_both() {
        let result = orchestrator()
            .execute_analysis_with_fallback(
                "group/app",
                || async { Err(Error::http(401, "bad token")) },
                |_| async { Err(Error::unexpected("no local manifest")) },
                &CancellationSignal::never(),
            )
            .await;

        match result {
            Err(Error::BothFailed { operation, .. }) => assert_eq!(operation, "group/app"),
            other => panic!("expected both-failed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_skips_fallback() {
        let orchestrator = orchestrator();
        let cancel = CancellationSignal::new();
        let partial_ran = AtomicBool::new(false);

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = orchestrator
            .execute_analysis_with_fallback(
                "group/app",
                || async {
                    std::future::pending::<()>().await;
                    Ok(vec![])
                },
                |_| async {
                    partial_ran.store(true, Ordering::SeqCst);
                    Ok(vec![])
                },
                &cancel,
            )
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(!partial_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let orchestrator = orchestrator();
        seed(&orchestrator).await;
        orchestrator.cache().insert("group/other", vec![]);

        assert_eq!(orchestrator.clear_cache(Some("group/app")), 1);
        assert_eq!(orchestrator.clear_cache(Some("group/app")), 0);
        assert_eq!(orchestrator.clear_cache(None), 1);
        assert_eq!(orchestrator.cache_stats().total_entries, 0);
    }
}
