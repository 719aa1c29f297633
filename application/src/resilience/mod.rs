//! Resilience around model-provider calls: retry backoff, admission
//! control, and the load-balanced client pool.

pub mod backoff;
pub mod client_pool;
pub mod rate_limiter;

pub use backoff::retry_delay;
pub use client_pool::{ChatClientPool, PoolReply};
pub use rate_limiter::{AdmissionPolicy, ConcurrencyPermit, RateLimitDecision, RateLimiter};
