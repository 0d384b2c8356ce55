//! Builder methods for creating errors with context

use super::types::Error;
use crate::types::RateLimitInfo;
use std::path::PathBuf;
use std::time::Duration;

// Helper methods for creating errors with context
impl Error {
    /// Create a network error
    #[must_use]
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an error from an HTTP status returned by the remote.
    ///
    /// 429 becomes [`Error::RateLimited`], 5xx [`Error::Server`], anything else
    /// [`Error::Client`].
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Error::RateLimited {
                message,
                rate_limit: None,
            },
            500..=599 => Error::Server { status, message },
            _ => Error::Client { status, message },
        }
    }

    /// Create a rate-limit error carrying the quota the remote reported
    #[must_use]
    pub fn rate_limited(message: impl Into<String>, rate_limit: Option<RateLimitInfo>) -> Self {
        Error::RateLimited {
            message: message.into(),
            rate_limit,
        }
    }

    /// Create a circuit-open error
    #[must_use]
    pub fn circuit_open(name: impl Into<String>, retry_after: Duration) -> Self {
        Error::CircuitOpen {
            name: name.into(),
            retry_after,
        }
    }

    /// Wrap the last failure of a retried operation
    #[must_use]
    pub fn exhausted_retries(attempts: u32, last: Error) -> Self {
        Error::ExhaustedRetries {
            attempts,
            source: Box::new(last),
        }
    }

    /// Combine a primary failure with the failure of its fallback
    #[must_use]
    pub fn both_failed(operation: impl Into<String>, primary: Error, fallback: Error) -> Self {
        Error::BothFailed {
            operation: operation.into(),
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create an unexpected error
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Error::Unexpected {
            message: message.into(),
            source: None,
        }
    }

    /// Create an unexpected error with a source error
    #[must_use]
    pub fn unexpected_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Unexpected {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

// Inspection helpers used by the classifier and the guidance renderer
impl Error {
    /// The error that actually ended the call, looking through retry and
    /// fallback wrappers. For [`Error::BothFailed`] this is the primary cause.
    #[must_use]
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::ExhaustedRetries { source, .. } => source.root_cause(),
            Error::BothFailed { primary, .. } => primary.root_cause(),
            other => other,
        }
    }

    /// HTTP status of the root cause, if the remote answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.root_cause() {
            Error::RateLimited { .. } => Some(429),
            Error::Server { status, .. } | Error::Client { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate-limit metadata attached to the root cause
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        match self.root_cause() {
            Error::RateLimited { rate_limit, .. } => *rate_limit,
            _ => None,
        }
    }

    /// Whether this is a caller cancellation
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
