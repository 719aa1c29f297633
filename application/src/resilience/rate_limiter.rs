//! Request admission control.
//!
//! Admission algorithms are pure functions from `(now, prior state)` to
//! `(new state, verdict)`; the storage port runs them atomically per
//! key. That keeps the algorithms testable with plain function calls
//! and lets backends range from an in-memory map to a distributed
//! store without touching the logic here.

use crate::config::{RateLimitBehavior, RateLimitConfig, RateLimitingStrategy};
use crate::ports::{AdmissionVerdict, RateLimitState, RateLimitStoreError, RateLimitStorePort};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Shortest poll interval while waiting on a full concurrency gate
const CONCURRENT_POLL: Duration = Duration::from_millis(100);

/// One admission algorithm with its parameters.
///
/// Stateless: all counters live in [`RateLimitState`], held by the
/// storage backend.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionPolicy {
    TokenBucket { capacity: f64, refill_per_second: f64 },
    FixedWindow { limit: u64, window_ms: i64 },
    SlidingWindow { limit: u64, window_ms: i64 },
    Concurrent { max_concurrent: u64 },
}

impl From<&RateLimitingStrategy> for AdmissionPolicy {
    fn from(strategy: &RateLimitingStrategy) -> Self {
        match *strategy {
            RateLimitingStrategy::TokenBucket {
                capacity,
                refill_per_second,
            } => AdmissionPolicy::TokenBucket {
                capacity,
                refill_per_second,
            },
            RateLimitingStrategy::FixedWindow {
                limit,
                window_seconds,
            } => AdmissionPolicy::FixedWindow {
                limit,
                window_ms: window_seconds as i64 * 1000,
            },
            RateLimitingStrategy::SlidingWindow {
                limit,
                window_seconds,
            } => AdmissionPolicy::SlidingWindow {
                limit,
                window_ms: window_seconds as i64 * 1000,
            },
            RateLimitingStrategy::Concurrent { max_concurrent } => {
                AdmissionPolicy::Concurrent { max_concurrent }
            }
        }
    }
}

impl AdmissionPolicy {
    /// Decide admission at `now_ms` given the key's prior state.
    ///
    /// Returns the state to persist and the verdict. `Denied` means no
    /// amount of waiting helps (a limit of zero); `RetryAfter` carries
    /// when capacity is expected to free.
    pub fn admit(
        &self,
        now_ms: i64,
        prior: Option<RateLimitState>,
    ) -> (RateLimitState, AdmissionVerdict) {
        match *self {
            AdmissionPolicy::TokenBucket {
                capacity,
                refill_per_second,
            } => {
                let (mut level, refilled_at_ms) = match prior {
                    Some(RateLimitState::TokenBucket {
                        level,
                        refilled_at_ms,
                    }) => (level, refilled_at_ms),
                    _ => (capacity, now_ms),
                };
                let elapsed = ((now_ms - refilled_at_ms).max(0) as f64) / 1000.0;
                level = (level + elapsed * refill_per_second).min(capacity);

                if level >= 1.0 {
                    (
                        RateLimitState::TokenBucket {
                            level: level - 1.0,
                            refilled_at_ms: now_ms,
                        },
                        AdmissionVerdict::Allowed,
                    )
                } else {
                    let verdict = if capacity < 1.0 || refill_per_second <= 0.0 {
                        AdmissionVerdict::Denied
                    } else {
                        AdmissionVerdict::RetryAfter(Duration::from_secs_f64(
                            (1.0 - level) / refill_per_second,
                        ))
                    };
                    (
                        RateLimitState::TokenBucket {
                            level,
                            refilled_at_ms: now_ms,
                        },
                        verdict,
                    )
                }
            }

            AdmissionPolicy::FixedWindow { limit, window_ms } => {
                let (mut count, mut window_start_ms) = match prior {
                    Some(RateLimitState::FixedWindow {
                        count,
                        window_start_ms,
                    }) => (count, window_start_ms),
                    _ => (0, now_ms),
                };
                if now_ms - window_start_ms >= window_ms {
                    count = 0;
                    window_start_ms = now_ms;
                }

                if limit == 0 {
                    (
                        RateLimitState::FixedWindow {
                            count,
                            window_start_ms,
                        },
                        AdmissionVerdict::Denied,
                    )
                } else if count < limit {
                    (
                        RateLimitState::FixedWindow {
                            count: count + 1,
                            window_start_ms,
                        },
                        AdmissionVerdict::Allowed,
                    )
                } else {
                    let remaining = (window_start_ms + window_ms - now_ms).max(0) as u64;
                    (
                        RateLimitState::FixedWindow {
                            count,
                            window_start_ms,
                        },
                        AdmissionVerdict::RetryAfter(Duration::from_millis(remaining)),
                    )
                }
            }

            AdmissionPolicy::SlidingWindow { limit, window_ms } => {
                let (mut count, mut previous_count, mut window_start_ms) = match prior {
                    Some(RateLimitState::SlidingWindow {
                        count,
                        previous_count,
                        window_start_ms,
                    }) => (count, previous_count, window_start_ms),
                    _ => (0, 0, now_ms),
                };
                let elapsed = now_ms - window_start_ms;
                if elapsed >= window_ms {
                    // A full window rolled over; two windows of silence
                    // clears the previous count entirely.
                    previous_count = if elapsed >= 2 * window_ms { 0 } else { count };
                    count = 0;
                    window_start_ms = now_ms - (elapsed % window_ms);
                }

                let fraction_elapsed =
                    ((now_ms - window_start_ms).max(0) as f64) / (window_ms as f64);
                let weighted = previous_count as f64 * (1.0 - fraction_elapsed) + count as f64;

                if limit == 0 {
                    (
                        RateLimitState::SlidingWindow {
                            count,
                            previous_count,
                            window_start_ms,
                        },
                        AdmissionVerdict::Denied,
                    )
                } else if weighted + 1.0 <= limit as f64 {
                    (
                        RateLimitState::SlidingWindow {
                            count: count + 1,
                            previous_count,
                            window_start_ms,
                        },
                        AdmissionVerdict::Allowed,
                    )
                } else {
                    let remaining = (window_start_ms + window_ms - now_ms).max(0) as u64;
                    (
                        RateLimitState::SlidingWindow {
                            count,
                            previous_count,
                            window_start_ms,
                        },
                        AdmissionVerdict::RetryAfter(Duration::from_millis(
                            remaining.min(window_ms as u64),
                        )),
                    )
                }
            }

            AdmissionPolicy::Concurrent { max_concurrent } => {
                let holders = match prior {
                    Some(RateLimitState::Concurrent { holders }) => holders,
                    _ => 0,
                };
                if max_concurrent == 0 {
                    (
                        RateLimitState::Concurrent { holders },
                        AdmissionVerdict::Denied,
                    )
                } else if holders < max_concurrent {
                    (
                        RateLimitState::Concurrent {
                            holders: holders + 1,
                        },
                        AdmissionVerdict::Allowed,
                    )
                } else {
                    // No completion signal reaches the limiter, so
                    // waiters poll.
                    (
                        RateLimitState::Concurrent { holders },
                        AdmissionVerdict::RetryAfter(CONCURRENT_POLL),
                    )
                }
            }
        }
    }
}

/// Releases one concurrency slot when dropped.
///
/// Only the `Concurrent` policy hands these out; the other algorithms
/// admit and forget.
pub struct ConcurrencyPermit {
    store: Arc<dyn RateLimitStorePort>,
    key: String,
    released: bool,
}

impl ConcurrencyPermit {
    fn new(store: Arc<dyn RateLimitStorePort>, key: String) -> Self {
        Self {
            store,
            key,
            released: false,
        }
    }

    /// Release the slot now instead of at drop time
    pub async fn release(mut self) {
        self.released = true;
        release_slot(&*self.store, &self.key).await;
    }
}

impl Drop for ConcurrencyPermit {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let store = Arc::clone(&self.store);
        let key = std::mem::take(&mut self.key);
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async move {
                release_slot(&*store, &key).await;
            });
        }
    }
}

async fn release_slot(store: &dyn RateLimitStorePort, key: &str) {
    let result = store
        .read_modify_write(key, &|prior| {
            let holders = match prior {
                Some(RateLimitState::Concurrent { holders }) => holders.saturating_sub(1),
                _ => 0,
            };
            (
                RateLimitState::Concurrent { holders },
                AdmissionVerdict::Allowed,
            )
        })
        .await;
    if let Err(e) = result {
        tracing::warn!(key, error = %e, "Failed to release concurrency slot");
    }
}

/// Outcome of one acquisition attempt
pub enum RateLimitDecision {
    /// Proceed; holds a permit under the `Concurrent` policy
    Admitted(Option<ConcurrencyPermit>),
    /// Denied, and the configured behavior routes to the fallback chain
    Fallback,
    /// Denied outright (or wait timed out)
    Rejected(String),
}

impl RateLimitDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateLimitDecision::Admitted(_))
    }
}

/// Admission gate in front of the chat client pool.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStorePort>,
    policy: AdmissionPolicy,
    behavior: RateLimitBehavior,
    wait_timeout: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStorePort>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            policy: AdmissionPolicy::from(&config.strategy),
            behavior: config.behavior,
            wait_timeout: Duration::from_secs_f64(config.wait_timeout_seconds.max(0.0)),
        }
    }

    pub fn behavior(&self) -> RateLimitBehavior {
        self.behavior
    }

    /// Try to admit one request under `key`.
    ///
    /// `Wait` blocks (bounded by the configured wait timeout) until
    /// capacity frees; `Reject` and `Fallback` answer immediately.
    pub async fn acquire(&self, key: &str) -> Result<RateLimitDecision, RateLimitStoreError> {
        let mut waited = Duration::ZERO;
        loop {
            let verdict = self.check_once(key).await?;
            match verdict {
                AdmissionVerdict::Allowed => {
                    let permit = if matches!(self.policy, AdmissionPolicy::Concurrent { .. }) {
                        Some(ConcurrencyPermit::new(
                            Arc::clone(&self.store),
                            key.to_string(),
                        ))
                    } else {
                        None
                    };
                    return Ok(RateLimitDecision::Admitted(permit));
                }
                AdmissionVerdict::Denied => {
                    return Ok(self.denied(key, "no capacity will become available"));
                }
                AdmissionVerdict::RetryAfter(delay) => match self.behavior {
                    RateLimitBehavior::Reject | RateLimitBehavior::Fallback => {
                        return Ok(self.denied(key, "limit exceeded"));
                    }
                    RateLimitBehavior::Wait => {
                        if waited + delay > self.wait_timeout {
                            return Ok(RateLimitDecision::Rejected(format!(
                                "'{key}': wait exceeded {:.1}s",
                                self.wait_timeout.as_secs_f64()
                            )));
                        }
                        tracing::debug!(key, delay_ms = delay.as_millis() as u64, "Rate limited, waiting");
                        tokio::time::sleep(delay).await;
                        waited += delay;
                    }
                },
            }
        }
    }

    fn denied(&self, key: &str, reason: &str) -> RateLimitDecision {
        match self.behavior {
            RateLimitBehavior::Fallback => {
                tracing::debug!(key, "Rate limited, diverting to fallback clients");
                RateLimitDecision::Fallback
            }
            _ => RateLimitDecision::Rejected(format!("'{key}': {reason}")),
        }
    }

    async fn check_once(&self, key: &str) -> Result<AdmissionVerdict, RateLimitStoreError> {
        let policy = self.policy.clone();
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.store
            .read_modify_write(key, &move |prior| policy.admit(now_ms, prior))
            .await
    }
}

// -- Tests --------------------------------------------------------------
