//! Rate-limit storage port
//!
//! Admission algorithms are storage-agnostic: they are pure functions
//! from `(now, previous state)` to `(new state, verdict)`, and the
//! store's only job is to run that function atomically per key. The
//! in-memory store uses a per-key lock; a distributed backend would use
//! compare-and-swap. Never a global lock across unrelated keys.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a rate-limit storage backend
#[derive(Error, Debug, Clone)]
pub enum RateLimitStoreError {
    #[error("Rate-limit storage error: {0}")]
    Backend(String),
}

/// Per-key counters whose shape depends on the admission algorithm.
///
/// Counters never go negative — mutators use saturating arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum RateLimitState {
    TokenBucket {
        /// Current token level, 0..=capacity
        level: f64,
        /// Last refill timestamp, unix milliseconds
        refilled_at_ms: i64,
    },
    FixedWindow {
        count: u64,
        window_start_ms: i64,
    },
    SlidingWindow {
        count: u64,
        previous_count: u64,
        window_start_ms: i64,
    },
    Concurrent {
        holders: u64,
    },
}

/// Result of one admission check
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionVerdict {
    Allowed,
    /// Capacity expected to free after this duration
    RetryAfter(Duration),
    Denied,
}

/// Mutator applied atomically to one key's state
pub type StateMutator<'a> =
    &'a (dyn Fn(Option<RateLimitState>) -> (RateLimitState, AdmissionVerdict) + Send + Sync);

/// Port for rate-limit state storage.
///
/// `read_modify_write` must apply the mutator atomically with respect
/// to other calls for the same key.
#[async_trait]
pub trait RateLimitStorePort: Send + Sync {
    async fn read_modify_write(
        &self,
        key: &str,
        apply: StateMutator<'_>,
    ) -> Result<AdmissionVerdict, RateLimitStoreError>;
}
