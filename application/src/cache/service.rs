//! Cache service.
//!
//! Layers behavior and key namespacing over the raw storage port. Two
//! kinds of entries live here: scene results (keyed by a fingerprint of
//! scene name, execution mode, input and conversation history) and
//! continuation state for suspended scenes (keyed by token, consumed at
//! most once).

use crate::config::CacheConfig;
use crate::ports::{CacheStoreError, CacheStorePort};
use stagecraft_domain::{
    CacheBehavior, ContinuationState, ContinuationToken, Conversation, ExecutionMode,
};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

/// Extra continuation TTL beyond the client timeout, so the expiry
/// watchdog can still observe the entry at the deadline before the
/// store garbage-collects it.
const CONTINUATION_TTL_SLACK_SECS: u64 = 60;

pub struct CacheService {
    store: Arc<dyn CacheStorePort>,
    config: CacheConfig,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStorePort>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Cache key for a scene result: namespaced, with a fingerprint of
    /// mode, input and history so two requests only share an entry when
    /// the whole conversation leading up to them matches.
    pub fn result_key(
        &self,
        scene_name: &str,
        mode: ExecutionMode,
        input: &str,
        history: &Conversation,
    ) -> String {
        let mut hasher = DefaultHasher::new();
        scene_name.hash(&mut hasher);
        mode.hash(&mut hasher);
        input.hash(&mut hasher);
        history.hash(&mut hasher);
        format!(
            "{}:result:{}:{:016x}",
            self.config.key_prefix,
            scene_name,
            hasher.finish()
        )
    }

    fn continuation_key(&self, token: &ContinuationToken) -> String {
        format!("{}:continuation:{}", self.config.key_prefix, token)
    }

    /// Look up a cached result, honoring the effective behavior.
    /// `Avoidable` bypasses the cache entirely.
    pub async fn load_result(
        &self,
        behavior: CacheBehavior,
        key: &str,
    ) -> Result<Option<String>, CacheStoreError> {
        if behavior == CacheBehavior::Avoidable {
            return Ok(None);
        }
        self.store.get(key).await
    }

    /// Store a result. `Default` entries expire after the configured
    /// TTL, `Forever` entries never do, `Avoidable` writes nothing.
    pub async fn save_result(
        &self,
        behavior: CacheBehavior,
        key: &str,
        value: &str,
    ) -> Result<(), CacheStoreError> {
        let ttl = match behavior {
            CacheBehavior::Avoidable => return Ok(()),
            CacheBehavior::Default => Some(Duration::from_secs(self.config.default_ttl_seconds)),
            CacheBehavior::Forever => None,
        };
        self.store.set(key, value.to_string(), ttl).await
    }

    /// Persist suspended-scene state under its token.
    pub async fn put_continuation(
        &self,
        state: &ContinuationState,
    ) -> Result<(), CacheStoreError> {
        let value = serde_json::to_string(state)
            .map_err(|e| CacheStoreError::Backend(format!("continuation encode: {e}")))?;
        let ttl = Duration::from_secs(state.timeout_seconds + CONTINUATION_TTL_SLACK_SECS);
        self.store
            .set(&self.continuation_key(&state.token), value, Some(ttl))
            .await
    }

    /// Atomically consume a continuation.
    ///
    /// Returns `None` if the token is unknown, already consumed, or
    /// lost the get/delete race to another consumer. Exactly one caller
    /// ever receives a given state.
    pub async fn take_continuation(
        &self,
        token: &ContinuationToken,
    ) -> Result<Option<ContinuationState>, CacheStoreError> {
        let key = self.continuation_key(token);
        let Some(value) = self.store.get(&key).await? else {
            return Ok(None);
        };
        if !self.store.delete(&key).await? {
            // Someone else consumed it between our get and delete.
            return Ok(None);
        }
        let state = serde_json::from_str(&value)
            .map_err(|e| CacheStoreError::Backend(format!("continuation decode: {e}")))?;
        Ok(Some(state))
    }
}

// -- Tests --------------------------------------------------------------
