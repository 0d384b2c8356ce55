//! Extension traits for error handling

use super::types::{Error, Result};

/// Extension trait for lifting foreign errors into [`Error`] with context.
///
/// The foreign error is kept as the source, so it still shows up in the
/// error chain. The result classifies as an unknown failure.
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a lazy message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let message = message.into();
            Error::Unexpected {
                message: format!("{message}: {e}"),
                source: Some(Box::new(e)),
            }
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Error::Unexpected {
            message: format!("{}: {}", f(), e),
            source: Some(Box::new(e)),
        })
    }
}
