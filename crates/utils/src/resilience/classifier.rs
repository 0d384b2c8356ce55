//! Centralized retry and fallback decisions.
//!
//! Call sites never pattern-match on errors themselves; they ask the
//! classifier. Supporting a new backend only means teaching [`ErrorClassifier::classify`]
//! about its failures.

use super::retry::RetryPolicy;
use pipewright_core::Error;

/// What kind of failure an error represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Connection-level failure that usually goes away on its own
    Transient,
    /// The operation (or its transport) timed out
    Timeout,
    /// 429 from the remote
    RateLimited,
    /// 5xx from the remote
    Server,
    /// 408 from the remote
    RequestTimeout,
    /// 401 from the remote
    Unauthorized,
    /// 403 from the remote
    Forbidden,
    /// 404 from the remote
    NotFound,
    /// Any other 4xx
    Client,
    /// The caller cancelled
    Cancelled,
    /// The circuit breaker refused the call
    CircuitOpen,
    /// Anything else
    Unknown,
}

/// Pure error classification
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error by its root cause
    #[must_use]
    pub fn classify(error: &Error) -> ErrorClass {
        match error.root_cause() {
            Error::Network { .. } => ErrorClass::Transient,
            Error::Timeout { .. } => ErrorClass::Timeout,
            Error::RateLimited { .. } => ErrorClass::RateLimited,
            Error::Server { .. } => ErrorClass::Server,
            Error::Client { status, .. } => match status {
                401 => ErrorClass::Unauthorized,
                403 => ErrorClass::Forbidden,
                404 => ErrorClass::NotFound,
                408 => ErrorClass::RequestTimeout,
                _ => ErrorClass::Client,
            },
            Error::Cancelled => ErrorClass::Cancelled,
            Error::CircuitOpen { .. } => ErrorClass::CircuitOpen,
            _ => ErrorClass::Unknown,
        }
    }

    /// Whether another attempt could plausibly succeed, ignoring attempt budget
    #[must_use]
    pub fn is_retryable(error: &Error) -> bool {
        matches!(
            Self::classify(error),
            ErrorClass::Transient
                | ErrorClass::Timeout
                | ErrorClass::RateLimited
                | ErrorClass::Server
                | ErrorClass::RequestTimeout
        )
    }

    /// Whether the retry loop should sleep and try again after `attempt` (0-based) failed.
    ///
    /// Always false on the last allowed attempt, so no delay follows it.
    #[must_use]
    pub fn should_retry(error: &Error, attempt: u32, policy: &RetryPolicy) -> bool {
        if attempt >= policy.max_attempts.saturating_sub(1) {
            return false;
        }
        Self::is_retryable(error)
    }

    /// Whether a terminal failure may be replaced by a degraded fallback.
    ///
    /// 404 is not eligible here; the analysis orchestrator makes an exception
    /// when it holds a cached snapshot for the same key.
    #[must_use]
    pub fn should_fallback(error: &Error) -> bool {
        matches!(
            Self::classify(error),
            ErrorClass::Unauthorized
                | ErrorClass::Forbidden
                | ErrorClass::Server
                | ErrorClass::Unknown
                | ErrorClass::Timeout
                | ErrorClass::RequestTimeout
                | ErrorClass::Transient
                | ErrorClass::CircuitOpen
        )
    }
}
