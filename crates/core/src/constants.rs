/// Constants used throughout the pipewright codebase
use std::time::Duration;

// Environment variable names
pub const PIPEWRIGHT_LOG_VAR: &str = "PIPEWRIGHT_LOG";
pub const PIPEWRIGHT_CONFIG_VAR: &str = "PIPEWRIGHT_CONFIG";
pub const RETRY_MAX_ATTEMPTS_VAR: &str = "PIPEWRIGHT_RETRY_MAX_ATTEMPTS";
pub const RETRY_BASE_DELAY_MS_VAR: &str = "PIPEWRIGHT_RETRY_BASE_DELAY_MS";
pub const RETRY_MAX_DELAY_MS_VAR: &str = "PIPEWRIGHT_RETRY_MAX_DELAY_MS";
pub const RETRY_MULTIPLIER_VAR: &str = "PIPEWRIGHT_RETRY_MULTIPLIER";
pub const RETRY_PRESET_VAR: &str = "PIPEWRIGHT_RETRY_PRESET";
pub const BREAKER_THRESHOLD_VAR: &str = "PIPEWRIGHT_BREAKER_THRESHOLD";
pub const BREAKER_OPEN_TIMEOUT_SECS_VAR: &str = "PIPEWRIGHT_BREAKER_OPEN_TIMEOUT_SECS";
pub const REQUEST_TIMEOUT_SECS_VAR: &str = "PIPEWRIGHT_REQUEST_TIMEOUT_SECS";
pub const CACHE_TTL_SECS_VAR: &str = "PIPEWRIGHT_CACHE_TTL_SECS";

// Settings file, relative to the user config directory
pub const CONFIG_DIR_NAME: &str = "pipewright";
pub const RESILIENCE_CONFIG_FILENAME: &str = "resilience.json";

// Rate-limit response headers reported by the project-hosting API
pub const RATE_LIMIT_LIMIT_HEADER: &str = "RateLimit-Limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "RateLimit-Remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "RateLimit-Reset";

// Legacy spelling of the same headers
pub const X_RATE_LIMIT_PREFIX: &str = "X-";

// Deadline applied to one resilient call (all of its attempts)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// How long an analysis snapshot stays usable for degraded runs
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

// Safety margin added to the reported rate-limit reset time
pub const RATE_LIMIT_RESET_MARGIN: Duration = Duration::from_secs(5);

// Upper bound on any rate-limit pause, whatever the remote claims
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

// Upper bound on exponential rate-limit backoff between attempts
pub const MAX_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

// Upper bound on the random jitter added to generic backoff
pub const MAX_BACKOFF_JITTER: Duration = Duration::from_secs(1);

// Longest a circuit breaker may stay open before admitting a probe
pub const MAX_BREAKER_OPEN_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
