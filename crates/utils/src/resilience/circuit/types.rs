//! Core types and enums for circuit breaker functionality.

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed - requests pass through normally
    Closed,
    /// Circuit is open - requests fail immediately
    Open,
    /// Circuit is half-open - a single probe tests recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Statistics about circuit breaker state
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    /// Calls refused without invoking the operation
    pub rejected_count: u64,
    pub times_opened: u64,
    pub last_failure_time: Option<Instant>,
    pub last_state_change: Instant,
    /// Time left before an open circuit admits a probe
    pub next_attempt_in: Option<Duration>,
    pub probe_in_flight: bool,
}
