//! In-memory cache store.
//!
//! The default `CacheStorePort` adapter: a mutex-guarded map with lazy
//! TTL expiry. Entries are only reaped when touched, which is fine for
//! the request-scoped key population this backend sees; a shared
//! deployment would swap in a networked store behind the same port.

use async_trait::async_trait;
use stagecraft_application::ports::{CacheStoreError, CacheStorePort};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

struct Entry {
    value: String,
    /// Unix-millisecond expiry; `None` never expires
    expires_at_ms: Option<i64>,
}

impl Entry {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_some_and(|deadline| now_ms >= deadline)
    }
}

/// Process-local cache backend
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorePort for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired(now_ms) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), CacheStoreError> {
        let expires_at_ms =
            ttl.map(|d| chrono::Utc::now().timestamp_millis() + d.as_millis() as i64);
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value,
                expires_at_ms,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheStoreError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut entries = self.entries.lock().await;
        match entries.remove(key) {
            Some(entry) => Ok(!entry.is_expired(now_ms)),
            None => Ok(false),
        }
    }
}
