//! Shared runtime utilities and the remote-API resilience layer for pipewright
//!
//! Every call the analysis collaborators make to the project-hosting API goes
//! through the [`resilience`] module. The remaining modules hold the pieces it
//! needs from the runtime: tracing setup and cooperative cancellation.

pub mod resilience;
pub mod sync;
pub mod tracing;

pub use resilience::*;
pub use sync::*;
