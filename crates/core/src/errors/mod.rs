//! Error types and result extensions for pipewright operations

mod builders;
mod extensions;
mod types;

pub use extensions::*;
pub use types::{Error, Result};
