//! Configuration for the pipewright resilience layer
//!
//! This crate loads [`ResilienceSettings`] from defaults, the JSON settings
//! file and `PIPEWRIGHT_*` environment variables, and builds executors and
//! orchestrators from them.

pub mod loader;
pub mod settings;

pub use loader::SettingsLoader;
pub use settings::{CircuitBreakerSettings, ConfigSource, ResilienceSettings, RetrySettings};
