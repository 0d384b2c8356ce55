//! Resilience settings and the builders that turn them into live components

use pipewright_core::constants::{
    DEFAULT_CACHE_TTL, DEFAULT_REQUEST_TIMEOUT, MAX_BREAKER_OPEN_TIMEOUT,
};
use pipewright_core::{Error, Result};
use pipewright_utils::resilience::{
    CircuitBreakerConfig, FallbackOrchestrator, ResilientExecutor, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where the effective settings were last overridden from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Built-in defaults
    #[default]
    Default,
    /// Settings file
    ConfigFile(PathBuf),
    /// Environment variables
    EnvironmentVariable(String),
}

/// Retry policy as stored in the settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl From<RetryPolicy> for RetrySettings {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: duration_millis(policy.base_delay),
            max_delay_ms: duration_millis(policy.max_delay),
            backoff_multiplier: policy.backoff_multiplier,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetryPolicy::DEFAULT.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub open_timeout_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        let config = CircuitBreakerConfig::default();
        Self {
            failure_threshold: config.failure_threshold,
            open_timeout_secs: config.open_timeout.as_secs(),
        }
    }
}

/// Effective configuration of the resilience layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
    /// Deadline for one resilient call, covering all of its attempts
    pub request_timeout_secs: u64,
    /// How long an analysis snapshot stays usable for degraded runs
    pub cache_ttl_secs: u64,
    #[serde(skip)]
    pub source: ConfigSource,
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            source: ConfigSource::Default,
        }
    }
}

impl ResilienceSettings {
    /// Reject settings the resilience layer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::configuration("retry.max_attempts must be at least 1"));
        }
        let multiplier = self.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(Error::configuration(format!(
                "retry.backoff_multiplier must be at least 1.0, got {multiplier}"
            )));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::configuration(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(Error::configuration(
                "circuit_breaker.failure_threshold must be at least 1",
            ));
        }
        if self.circuit_breaker.open_timeout_secs > MAX_BREAKER_OPEN_TIMEOUT.as_secs() {
            return Err(Error::configuration(format!(
                "circuit_breaker.open_timeout_secs must be at most {}, got {}",
                MAX_BREAKER_OPEN_TIMEOUT.as_secs(),
                self.circuit_breaker.open_timeout_secs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::configuration("request_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
        }
    }

    #[must_use]
    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(
            self.circuit_breaker.failure_threshold,
            Duration::from_secs(self.circuit_breaker.open_timeout_secs),
        )
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Executor for the endpoint `name`, with its own circuit breaker
    #[must_use]
    pub fn build_executor(&self, name: impl Into<String>) -> ResilientExecutor {
        ResilientExecutor::new(name, self.circuit_breaker_config())
            .with_retry_policy(self.retry_policy())
            .with_timeout(self.request_timeout())
    }

    #[must_use]
    pub fn build_orchestrator<T: Clone>(&self) -> FallbackOrchestrator<T> {
        FallbackOrchestrator::new(self.cache_ttl())
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
