//! Layered loading of [`ResilienceSettings`]
//!
//! Precedence, lowest first: built-in defaults, the JSON settings file,
//! environment variables. The result is validated before it is returned.

use crate::settings::{ConfigSource, ResilienceSettings, RetrySettings};
use pipewright_core::constants::{
    BREAKER_OPEN_TIMEOUT_SECS_VAR, BREAKER_THRESHOLD_VAR, CACHE_TTL_SECS_VAR, CONFIG_DIR_NAME,
    PIPEWRIGHT_CONFIG_VAR, REQUEST_TIMEOUT_SECS_VAR, RESILIENCE_CONFIG_FILENAME,
    RETRY_BASE_DELAY_MS_VAR, RETRY_MAX_ATTEMPTS_VAR, RETRY_MAX_DELAY_MS_VAR,
    RETRY_MULTIPLIER_VAR, RETRY_PRESET_VAR,
};
use pipewright_core::{Error, Result};
use pipewright_utils::resilience::RetryPolicy;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Configuration loader that handles precedence
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings with full precedence handling
    pub fn load() -> Result<ResilienceSettings> {
        let mut settings = Self::load_defaults();

        if let Some(file_settings) = Self::load_from_config_file()? {
            settings = file_settings;
        }

        let settings = Self::apply_env(settings)?;
        settings.validate()?;

        debug!(source = ?settings.source, "resilience settings loaded");
        Ok(settings)
    }

    fn load_defaults() -> ResilienceSettings {
        ResilienceSettings::default()
    }

    /// Settings file contents, if the file exists.
    ///
    /// A path named explicitly through `PIPEWRIGHT_CONFIG` must exist; the
    /// default location is optional.
    fn load_from_config_file() -> Result<Option<ResilienceSettings>> {
        if let Ok(explicit) = std::env::var(PIPEWRIGHT_CONFIG_VAR) {
            return Self::load_from_file(Path::new(&explicit)).map(Some);
        }

        let Some(path) = Self::default_config_file_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from_file(&path).map(Some)
    }

    /// Read settings from a JSON file. Missing fields keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<ResilienceSettings> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read settings file", e))?;

        let mut settings: ResilienceSettings =
            serde_json::from_str(&content).map_err(|e| Error::Json {
                message: format!("invalid settings file '{}'", path.display()),
                source: e,
            })?;
        settings.source = ConfigSource::ConfigFile(path.to_path_buf());
        Ok(settings)
    }

    /// Default settings file location: `<config_dir>/pipewright/resilience.json`
    #[must_use]
    pub fn default_config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(RESILIENCE_CONFIG_FILENAME))
    }

    /// Override `settings` from `PIPEWRIGHT_*` environment variables.
    ///
    /// A retry preset is applied first so the individual retry variables can
    /// refine it.
    pub fn apply_env(mut settings: ResilienceSettings) -> Result<ResilienceSettings> {
        let mut has_env_config = false;

        if let Ok(name) = std::env::var(RETRY_PRESET_VAR) {
            let policy = RetryPolicy::preset(&name).ok_or_else(|| {
                Error::configuration(format!(
                    "unknown retry preset '{name}' in {RETRY_PRESET_VAR} \
                     (expected default, aggressive or conservative)"
                ))
            })?;
            settings.retry = RetrySettings::from(policy);
            has_env_config = true;
        }

        has_env_config |= override_from_env(RETRY_MAX_ATTEMPTS_VAR, &mut settings.retry.max_attempts)?;
        has_env_config |= override_from_env(RETRY_BASE_DELAY_MS_VAR, &mut settings.retry.base_delay_ms)?;
        has_env_config |= override_from_env(RETRY_MAX_DELAY_MS_VAR, &mut settings.retry.max_delay_ms)?;
        has_env_config |=
            override_from_env(RETRY_MULTIPLIER_VAR, &mut settings.retry.backoff_multiplier)?;
        has_env_config |= override_from_env(
            BREAKER_THRESHOLD_VAR,
            &mut settings.circuit_breaker.failure_threshold,
        )?;
        has_env_config |= override_from_env(
            BREAKER_OPEN_TIMEOUT_SECS_VAR,
            &mut settings.circuit_breaker.open_timeout_secs,
        )?;
        has_env_config |=
            override_from_env(REQUEST_TIMEOUT_SECS_VAR, &mut settings.request_timeout_secs)?;
        has_env_config |= override_from_env(CACHE_TTL_SECS_VAR, &mut settings.cache_ttl_secs)?;

        if has_env_config {
            settings.source = ConfigSource::EnvironmentVariable("PIPEWRIGHT_*".to_string());
        }
        Ok(settings)
    }
}

/// Parse `var` into `target` when it is set. Returns whether it was.
fn override_from_env<T: FromStr>(var: &str, target: &mut T) -> Result<bool> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(false);
    };
    *target = raw.trim().parse().map_err(|_| {
        Error::configuration(format!("invalid value '{raw}' for {var}"))
    })?;
    Ok(true)
}
