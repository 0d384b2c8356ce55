//! User-facing advice for a failed remote call.

use crate::resilience::classifier::{ErrorClass, ErrorClassifier};
use pipewright_core::Error;
use std::fmt;

/// What to tell the user after a remote failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGuidance {
    pub message: String,
    pub suggestions: Vec<String>,
    /// A degraded (cached or partial) analysis is still worth producing
    pub can_continue_degraded: bool,
    /// The same request is likely to work if repeated later
    pub should_retry_later: bool,
}

impl UserGuidance {
    fn new(message: String, can_continue_degraded: bool, should_retry_later: bool) -> Self {
        Self {
            message,
            suggestions: Vec::new(),
            can_continue_degraded,
            should_retry_later,
        }
    }

    fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl fmt::Display for UserGuidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for suggestion in &self.suggestions {
            write!(f, "\n  - {suggestion}")?;
        }
        Ok(())
    }
}

/// Map an error to guidance for `context` (e.g. "analyzing group/app").
///
/// Pure: the answer depends only on the error's classification and any
/// rate-limit metadata it carries.
#[must_use]
pub fn derive_guidance(error: &Error, context: &str) -> UserGuidance {
    match ErrorClassifier::classify(error) {
        ErrorClass::Unauthorized => UserGuidance::new(
            format!("Authentication failed while {context}"),
            true,
            false,
        )
        .suggest("Check that your access token is set and has not expired")
        .suggest("Generate a new token if the current one was revoked"),

        ErrorClass::Forbidden => UserGuidance::new(
            format!("Permission denied while {context}"),
            true,
            false,
        )
        .suggest("Check that your token has the required scopes (e.g. read_api)")
        .suggest("Verify you are a member of the project with sufficient permissions"),

        ErrorClass::NotFound => UserGuidance::new(
            format!("Project not found while {context}"),
            true,
            false,
        )
        .suggest("Verify the project path or ID is spelled correctly")
        .suggest("Private projects return not-found without access"),

        ErrorClass::RateLimited => {
            let guidance = UserGuidance::new(
                format!("Rate limit exceeded while {context}"),
                false,
                true,
            );
            let guidance = match error.rate_limit().and_then(|info| info.reset_at()) {
                Some(reset) => guidance.suggest(format!(
                    "Wait until {} before retrying",
                    reset.to_rfc3339()
                )),
                None => guidance.suggest("Wait a few minutes before retrying"),
            };
            guidance.suggest("Reduce request frequency or batch size")
        }

        ErrorClass::Server => UserGuidance::new(
            format!("The remote service reported an error while {context}"),
            true,
            true,
        )
        .suggest("The service may be degraded; retry later")
        .suggest("Continuing with a degraded analysis"),

        ErrorClass::Transient | ErrorClass::Timeout | ErrorClass::RequestTimeout => {
            UserGuidance::new(
                format!("Could not reach the remote service while {context}"),
                true,
                true,
            )
            .suggest("Check your network connection")
            .suggest("Retry later if the service is slow to respond")
        }

        ErrorClass::CircuitOpen => UserGuidance::new(
            format!("The remote service is temporarily unavailable while {context}"),
            true,
            true,
        )
        .suggest("Recent calls failed repeatedly; requests are paused briefly")
        .suggest("Continuing with a degraded analysis"),

        ErrorClass::Cancelled => {
            UserGuidance::new(format!("Cancelled while {context}"), false, false)
        }

        ErrorClass::Client => UserGuidance::new(
            format!("The remote service rejected the request while {context}: {error}"),
            false,
            false,
        )
        .suggest("Check the request parameters"),

        ErrorClass::Unknown => UserGuidance::new(
            format!("Unexpected error while {context}: {error}"),
            true,
            false,
        )
        .suggest("Continuing with a degraded analysis"),
    }
}
