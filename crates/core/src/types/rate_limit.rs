use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

/// Quota metadata reported by the remote API alongside a response.
///
/// Derived per call and never persisted. Missing values are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RateLimitInfo {
    /// Requests allowed in the current window
    pub limit: u64,
    /// Requests left in the current window
    pub remaining: u64,
    /// When the window resets, in seconds since the Unix epoch
    pub reset_time: i64,
}

impl RateLimitInfo {
    #[must_use]
    pub fn new(limit: u64, remaining: u64, reset_time: i64) -> Self {
        Self {
            limit,
            remaining,
            reset_time,
        }
    }

    /// Whether the quota for the current window is used up
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Reset time as a wall-clock timestamp, if one was reported
    #[must_use]
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        if self.reset_time <= 0 {
            return None;
        }
        Utc.timestamp_opt(self.reset_time, 0).single()
    }
}

impl fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reset_at() {
            Some(reset) => write!(
                f,
                "{}/{} requests remaining, resets at {}",
                self.remaining,
                self.limit,
                reset.to_rfc3339()
            ),
            None => write!(f, "{}/{} requests remaining", self.remaining, self.limit),
        }
    }
}
