//! Value types shared by the pipewright crates.

mod rate_limit;

pub use rate_limit::RateLimitInfo;
