use pipewright_core::constants::PIPEWRIGHT_LOG_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use ::tracing::{debug, error, info, instrument, span, trace, warn, Instrument, Level, Span};

/// Initialize the tracing system
///
/// The filter comes from `PIPEWRIGHT_LOG`, then `RUST_LOG`, then defaults to
/// `info`. Output is a compact single-line format on stderr, with colours only
/// when stderr is a terminal. Calling this twice returns an error instead of
/// replacing the installed subscriber.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = env_filter()?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn env_filter() -> Result<EnvFilter, Box<dyn std::error::Error + Send + Sync + 'static>> {
    if let Ok(directives) = std::env::var(PIPEWRIGHT_LOG_VAR) {
        return Ok(EnvFilter::try_new(directives)?);
    }
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?)
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Create a span covering one resilient call to the remote API
pub fn remote_call_span(endpoint: &str) -> Span {
    span!(Level::INFO, "remote_call", endpoint = %endpoint)
}

/// Create a span covering a sequential batch of remote calls
pub fn batch_span(endpoint: &str, total_items: usize) -> Span {
    span!(Level::INFO, "remote_batch", endpoint = %endpoint, total_items = %total_items)
}

/// Create a span covering an analysis that may degrade to cached data
pub fn analysis_span(key: &str) -> Span {
    span!(Level::INFO, "analysis", key = %key)
}
