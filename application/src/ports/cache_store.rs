//! Cache backend port
//!
//! A minimal get/set/delete contract with optional TTL. The cache
//! service layers behavior (Default/Avoidable/Forever) and key
//! namespacing on top; backends only need per-key concurrent safety.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a cache backend
#[derive(Error, Debug, Clone)]
pub enum CacheStoreError {
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Port for cache storage.
///
/// Values are opaque strings (the cache service serializes structured
/// values to JSON). `ttl = None` means the entry never expires.
#[async_trait]
pub trait CacheStorePort: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError>;

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), CacheStoreError>;

    /// Delete an entry, returning whether it existed.
    ///
    /// The returned flag is what makes consume-once continuation reads
    /// possible: two racing consumers both `get`, but only one sees
    /// `true` here.
    async fn delete(&self, key: &str) -> Result<bool, CacheStoreError>;
}
