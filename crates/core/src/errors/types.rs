//! Core error type definitions

use crate::types::RateLimitInfo;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for pipewright operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pipewright operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transient transport failures (connection reset, DNS, TLS handshake)
    #[error("network error for '{endpoint}': {message}")]
    Network { endpoint: String, message: String },

    /// Operation timeout errors
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    /// The remote answered 429
    #[error("rate limited by remote: {message}")]
    RateLimited {
        message: String,
        rate_limit: Option<RateLimitInfo>,
    },

    /// The remote answered 5xx
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The remote answered 4xx (other than 429)
    #[error("client error {status}: {message}")]
    Client { status: u16, message: String },

    /// The caller asked for the operation to stop
    #[error("operation was cancelled")]
    Cancelled,

    /// Synthetic fail-fast error while the circuit breaker is open
    #[error("circuit breaker '{name}' is open - service unavailable, next attempt in {retry_after:?}")]
    CircuitOpen { name: String, retry_after: Duration },

    /// Every allowed attempt failed
    #[error("retries exhausted after {attempts} attempts: {source}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The primary operation and its fallback both failed
    #[error("'{operation}' failed ({primary}) and its fallback failed too ({fallback})")]
    BothFailed {
        operation: String,
        #[source]
        primary: Box<Error>,
        fallback: Box<Error>,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// File system operations
    #[error("file system {operation} operation failed for '{}': {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Anything the remote or a collaborator raised that has no better home
    #[error("unexpected error: {message}")]
    Unexpected {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}
