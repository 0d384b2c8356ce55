//! Circuit breaker state management and execution logic.

use super::config::CircuitBreakerConfig;
use super::transitions::{Admission, BreakerState};
use super::types::{CircuitBreakerStats, CircuitState};
use parking_lot::Mutex;
use pipewright_core::{Error, Result};
use std::future::Future;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker guarding one logical remote endpoint.
///
/// All state lives behind a single mutex. The lock is held only to admit a
/// call and to record its outcome, never while the operation runs.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState::new(Instant::now())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the stored state of the circuit.
    ///
    /// An open circuit whose timeout has elapsed still reports `Open` until a
    /// call arrives and becomes the probe.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Execute an operation through the circuit breaker
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let admission = self.inner.lock().admit(Instant::now());

        let probe = match admission {
            Admission::Reject { retry_after } => {
                debug!(breaker = %self.name, retry_after = ?retry_after, "circuit open, failing fast");
                return Err(Error::circuit_open(self.name.clone(), retry_after));
            }
            Admission::Probe => {
                info!(breaker = %self.name, "Circuit breaker entering half-open state");
                Some(ProbeGuard::new(&self.inner))
            }
            Admission::Proceed => None,
        };

        let result = operation().await;

        match &result {
            // Cancellation is not evidence about the remote; the guard below
            // hands the probe slot back.
            Err(error) if error.is_cancelled() => {}
            Ok(_) => {
                let changed = self
                    .inner
                    .lock()
                    .record_success(Instant::now(), probe.is_some());
                if let Some(state) = changed {
                    info!(breaker = %self.name, state = %state, "Circuit breaker closing");
                }
                disarm(probe);
            }
            Err(error) => {
                let (changed, failures) = {
                    let mut inner = self.inner.lock();
                    let changed =
                        inner.record_failure(Instant::now(), &self.config, probe.is_some());
                    (changed, inner.failure_count)
                };
                if let Some(state) = changed {
                    warn!(
                        breaker = %self.name,
                        state = %state,
                        failures,
                        open_for = ?self.config.open_timeout,
                        error = %error,
                        "Circuit breaker opening"
                    );
                }
                disarm(probe);
            }
        }

        result
    }

    /// Force the circuit closed and clear the failure count
    pub fn reset(&self) {
        if self.inner.lock().reset(Instant::now()).is_some() {
            info!(breaker = %self.name, "Circuit breaker reset");
        }
    }

    /// Get current circuit breaker statistics
    #[must_use]
    pub fn stats(&self) -> CircuitBreakerStats {
        self.inner.lock().snapshot(Instant::now())
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

/// Releases the half-open probe slot if the probe never reports an outcome
/// (cancelled, or its future dropped mid-flight).
struct ProbeGuard<'a> {
    inner: &'a Mutex<BreakerState>,
    armed: bool,
}

impl<'a> ProbeGuard<'a> {
    fn new(inner: &'a Mutex<BreakerState>) -> Self {
        Self { inner, armed: true }
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock().release_probe();
        }
    }
}

fn disarm(probe: Option<ProbeGuard<'_>>) {
    if let Some(mut guard) = probe {
        guard.armed = false;
    }
}
