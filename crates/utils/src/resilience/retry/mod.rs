//! Bounded retry with exponential backoff.
//!
//! [`RetryPolicy`] is plain data describing how often and how patiently to
//! retry; [`RetryExecutor`] runs the loop, asking the classifier after every
//! failure whether another attempt makes sense.

mod executor;
mod policy;

pub use executor::RetryExecutor;
pub use policy::RetryPolicy;
