//! Core domain types, errors, and constants for `pipewright`.
//!
//! Everything that talks to the remote project-hosting API reports failures
//! through the single [`Error`] enum defined here, so retry, circuit-breaker
//! and fallback decisions can be made from one place.
//!
//! ## Key Components
//!
//! - **`errors`**: The `Error` enum, the `Result` alias and the `ResultExt`
//!   context helpers.
//! - **`types`**: Small value types shared across crates, such as the
//!   rate-limit metadata reported by the remote API.
//! - **`constants`**: Environment variable names, header names and defaults.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
