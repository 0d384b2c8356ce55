//! Synchronization primitives shared by the async layers.

mod cancel;

pub use cancel::CancellationSignal;
