//! Circuit breaker for calls to a degraded remote
//!
//! After repeated failures the breaker opens and refuses calls outright,
//! so a service that is known to be down is not hammered with retries.
//! Once the open timeout elapses the next caller becomes a single probe:
//! success closes the circuit, failure opens it again.
//!
//! ## Architecture
//!
//! - [`types`] - `CircuitState` and the stats snapshot
//! - [`config`] - thresholds and timeouts
//! - [`transitions`] - the state machine, run under the breaker's mutex
//! - [`state`] - `CircuitBreaker` itself: admission, execution, recording
//! - `tests` - async lifecycle and concurrency tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use pipewright_utils::resilience::circuit::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> pipewright_core::Result<String> {
//! let cb = CircuitBreaker::new("projects-api", CircuitBreakerConfig::default());
//!
//! let result = cb.execute(|| async {
//!     // Your operation here
//!     Ok("success".to_string())
//! }).await;
//! result
//! # }
//! ```

pub mod config;
pub mod state;
mod transitions;
pub mod types;

// Re-export public API
pub use config::CircuitBreakerConfig;
pub use state::CircuitBreaker;
pub use types::{CircuitBreakerStats, CircuitState};
