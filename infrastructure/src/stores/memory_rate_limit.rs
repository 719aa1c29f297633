//! In-memory rate-limit store.
//!
//! Holds one async mutex per key so the mutator runs atomically with
//! respect to other calls for that key, while unrelated keys never
//! contend with each other.

use async_trait::async_trait;
use stagecraft_application::ports::{
    AdmissionVerdict, RateLimitState, RateLimitStoreError, RateLimitStorePort, StateMutator,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

type KeySlot = Arc<Mutex<Option<RateLimitState>>>;

/// Process-local rate-limit backend
#[derive(Default)]
pub struct MemoryRateLimitStore {
    keys: StdMutex<HashMap<String, KeySlot>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> KeySlot {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(keys.entry(key.to_string()).or_default())
    }
}

#[async_trait]
impl RateLimitStorePort for MemoryRateLimitStore {
    async fn read_modify_write(
        &self,
        key: &str,
        apply: StateMutator<'_>,
    ) -> Result<AdmissionVerdict, RateLimitStoreError> {
        let slot = self.slot(key);
        let mut state = slot.lock().await;
        let (next, verdict) = apply(state.take());
        *state = Some(next);
        Ok(verdict)
    }
}
