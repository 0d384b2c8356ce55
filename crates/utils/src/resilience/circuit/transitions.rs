//! State transition logic for circuit breaker.
//!
//! [`BreakerState`] is the data guarded by the breaker's mutex. Every method
//! here runs with that lock held and never awaits.

use super::config::CircuitBreakerConfig;
use super::types::{CircuitBreakerStats, CircuitState};
use std::time::Duration;
use tokio::time::Instant;

/// Stand-in deadline when `now + open_timeout` overflows the clock
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Outcome of asking whether a call may go through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Admission {
    /// Closed circuit, call normally
    Proceed,
    /// This caller is the single half-open probe
    Probe,
    /// Fail fast without invoking the operation
    Reject { retry_after: Duration },
}

#[derive(Debug)]
pub(super) struct BreakerState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub next_attempt_time: Option<Instant>,
    pub probe_in_flight: bool,
    pub rejected_count: u64,
    pub times_opened: u64,
    pub last_failure_time: Option<Instant>,
    pub last_state_change: Instant,
}

impl BreakerState {
    pub fn new(now: Instant) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            next_attempt_time: None,
            probe_in_flight: false,
            rejected_count: 0,
            times_opened: 0,
            last_failure_time: None,
            last_state_change: now,
        }
    }

    /// Decide whether a call may proceed. Open→HalfOpen happens here, lazily.
    pub fn admit(&mut self, now: Instant) -> Admission {
        match self.state {
            CircuitState::Closed => Admission::Proceed,
            CircuitState::Open => match self.next_attempt_time {
                Some(next) if now < next => self.reject(next - now),
                _ => {
                    self.transition(CircuitState::HalfOpen, now);
                    self.probe_in_flight = true;
                    Admission::Probe
                }
            },
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    self.reject(Duration::ZERO)
                } else {
                    // The previous probe was cancelled before reporting back
                    self.probe_in_flight = true;
                    Admission::Probe
                }
            }
        }
    }

    /// Record a successful call. Returns the new state if it changed.
    ///
    /// While HalfOpen only the probe's own outcome moves the state; a call
    /// admitted before the circuit opened leaves the probe slot alone.
    pub fn record_success(&mut self, now: Instant, is_probe: bool) -> Option<CircuitState> {
        if self.state == CircuitState::HalfOpen && !is_probe {
            return None;
        }
        self.failure_count = 0;
        if is_probe {
            self.probe_in_flight = false;
        }
        self.transition(CircuitState::Closed, now)
    }

    /// Record a failed call. Returns the new state if it changed.
    pub fn record_failure(
        &mut self,
        now: Instant,
        config: &CircuitBreakerConfig,
        is_probe: bool,
    ) -> Option<CircuitState> {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_time = Some(now);

        match self.state {
            // A failed probe re-opens immediately, whatever the count
            CircuitState::HalfOpen if is_probe => {
                self.probe_in_flight = false;
                self.open(now, config)
            }
            CircuitState::Closed if self.failure_count >= config.failure_threshold => {
                self.open(now, config)
            }
            CircuitState::Closed | CircuitState::Open | CircuitState::HalfOpen => None,
        }
    }

    /// Give the probe slot back without recording an outcome
    pub fn release_probe(&mut self) {
        self.probe_in_flight = false;
    }

    /// Administrative reset. Returns the new state if it changed.
    pub fn reset(&mut self, now: Instant) -> Option<CircuitState> {
        self.failure_count = 0;
        self.probe_in_flight = false;
        self.next_attempt_time = None;
        self.transition(CircuitState::Closed, now)
    }

    pub fn snapshot(&self, now: Instant) -> CircuitBreakerStats {
        let next_attempt_in = match (self.state, self.next_attempt_time) {
            (CircuitState::Open, Some(next)) => Some(next.saturating_duration_since(now)),
            _ => None,
        };

        CircuitBreakerStats {
            state: self.state,
            failure_count: self.failure_count,
            rejected_count: self.rejected_count,
            times_opened: self.times_opened,
            last_failure_time: self.last_failure_time,
            last_state_change: self.last_state_change,
            next_attempt_in,
            probe_in_flight: self.probe_in_flight,
        }
    }

    fn open(&mut self, now: Instant, config: &CircuitBreakerConfig) -> Option<CircuitState> {
        // An absurd timeout saturates to "open for as long as the clock allows"
        self.next_attempt_time = Some(
            now.checked_add(config.open_timeout)
                .or_else(|| now.checked_add(FAR_FUTURE))
                .unwrap_or(now),
        );
        self.times_opened += 1;
        self.transition(CircuitState::Open, now)
    }

    fn reject(&mut self, retry_after: Duration) -> Admission {
        self.rejected_count += 1;
        Admission::Reject { retry_after }
    }

    fn transition(&mut self, to: CircuitState, now: Instant) -> Option<CircuitState> {
        if self.state == to {
            return None;
        }
        self.state = to;
        self.last_state_change = now;
        if to == CircuitState::Closed {
            self.next_attempt_time = None;
        }
        Some(to)
    }
}
