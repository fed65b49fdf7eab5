//! Oracle adapters and call plumbing: HTTP adapter, scripted stand-in,
//! retry policy, and rate limiting.

pub mod http;
pub mod rate_limiter;
pub mod retry;
pub mod scripted;

pub use http::HttpOracle;
pub use rate_limiter::TokenBucketRateLimiter;
pub use retry::RetryPolicy;
pub use scripted::{ScriptedOracle, ScriptedResponse};
