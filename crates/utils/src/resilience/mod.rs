//! Resilience patterns for calls to the remote project-hosting API.
//!
//! The remote is occasionally unreliable, so every call is routed through a
//! small stack of cooperating pieces:
//!
//! ```text
//! caller -> ResilientExecutor -> CircuitBreaker -> RetryExecutor -> operation
//!                                                     |
//!                                     ErrorClassifier / RateLimiter
//! ```
//!
//! When the resilient call still fails, the caller hands off to the
//! [`FallbackOrchestrator`], which substitutes a fallback operation, optionally
//! fed from a TTL cache of earlier results, and tags the result as degraded.
//!
//! ## Key Components
//!
//! - **`classifier`**: Pure mapping from an error to retry/fallback decisions.
//! - **`rate_limit`**: Parses quota headers and computes pacing delays.
//! - **`retry`**: Retry policies and the retry loop with backoff and jitter.
//! - **`circuit`**: The circuit breaker state machine.
//! - **`executor`**: Timeout + breaker + retry composition and the sequential
//!   partial-failure batch runner.
//! - **`fallback`**: Degraded-mode orchestration, the analysis cache and user
//!   guidance.
//!
//! Nothing in here is global. Construct one executor per remote endpoint and
//! one orchestrator per analysis cache, and pass them by reference.

pub mod circuit;
pub mod classifier;
pub mod executor;
pub mod fallback;
pub mod rate_limit;
pub mod retry;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use classifier::{ErrorClass, ErrorClassifier};
pub use executor::{BatchResult, OperationResult, ResilientExecutor};
pub use fallback::{
    derive_guidance, AnalysisCache, AnalysisResult, CacheStats, CachedEntry, FallbackOrchestrator,
    FallbackResult, UserGuidance,
};
pub use rate_limit::RateLimiter;
pub use retry::{RetryExecutor, RetryPolicy};
