//! Fallback orchestration and degraded analysis.
//!
//! - [`orchestrator`] - primary/fallback composition and cached degraded analysis
//! - [`cache`] - TTL cache of earlier full analyses, evicted lazily on lookup
//! - [`guidance`] - pure mapping from a failure to advice for the user

pub mod cache;
pub mod guidance;
pub mod orchestrator;

pub use cache::{AnalysisCache, CacheStats, CachedEntry};
pub use guidance::{derive_guidance, UserGuidance};
pub use orchestrator::{AnalysisResult, FallbackOrchestrator, FallbackResult};
