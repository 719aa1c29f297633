//! Chat client pool.
//!
//! Fronts a set of interchangeable model-provider clients with load
//! balancing, per-client retry with exponential backoff, a fallback
//! chain for when every primary fails, and a cost ledger that prices
//! raw token counts with the answering client's settings.

use crate::config::{LoadBalancingMode, PoolConfig, TokenCostSettings};
use crate::ports::{ChatProviderPort, ProviderError, ToolDescriptor};
use crate::resilience::backoff::retry_delay;
use crate::resilience::rate_limiter::{RateLimitDecision, RateLimiter};
use rand::Rng;
use stagecraft_domain::{EngineError, Message, ProviderReply, TokenUsage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One registered client: a provider adapter plus its pricing
#[derive(Clone)]
struct ChatClient {
    name: String,
    provider: Arc<dyn ChatProviderPort>,
    costs: TokenCostSettings,
}

/// A successful pool response, attributed to the client that produced it
#[derive(Debug, Clone)]
pub struct PoolReply {
    pub reply: ProviderReply,
    pub client_name: String,
    /// Token counts priced with the answering client's cost settings
    pub usage: TokenUsage,
}

/// Result of walking one client chain
enum ChainOutcome {
    Answered(PoolReply),
    /// A client's rate limiter routed the request to the fallback chain
    Diverted,
    /// Every client failed or was denied; `None` means the chain is empty
    Exhausted(Option<EngineError>),
}

/// Load-balanced, retrying, fallback-capable front for provider clients.
pub struct ChatClientPool {
    primaries: Vec<ChatClient>,
    fallbacks: Vec<ChatClient>,
    load_balancing: LoadBalancingMode,
    fallback_mode: LoadBalancingMode,
    max_retry_attempts: u32,
    retry_base_delay_seconds: f64,
    primary_cursor: AtomicUsize,
    fallback_cursor: AtomicUsize,
    rate_limiter: Option<Arc<RateLimiter>>,
    costs: HashMap<String, TokenCostSettings>,
    ledger: Mutex<HashMap<String, TokenUsage>>,
}

impl ChatClientPool {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            primaries: Vec::new(),
            fallbacks: Vec::new(),
            load_balancing: config.load_balancing,
            fallback_mode: config.fallback_mode,
            max_retry_attempts: config.max_retry_attempts.max(1),
            retry_base_delay_seconds: config.retry_base_delay_seconds,
            primary_cursor: AtomicUsize::new(0),
            fallback_cursor: AtomicUsize::new(0),
            rate_limiter: None,
            costs: config.costs.clone(),
            ledger: Mutex::new(HashMap::new()),
        }
    }

    /// Register a primary client. Pricing comes from the pool config's
    /// cost table, keyed by client name.
    pub fn with_primary(mut self, name: impl Into<String>, provider: Arc<dyn ChatProviderPort>) -> Self {
        let name = name.into();
        let costs = self.costs.get(&name).copied().unwrap_or_default();
        self.primaries.push(ChatClient {
            name,
            provider,
            costs,
        });
        self
    }

    /// Register a fallback client, tried only when every primary fails
    /// or the rate limiter diverts.
    pub fn with_fallback(mut self, name: impl Into<String>, provider: Arc<dyn ChatProviderPort>) -> Self {
        let name = name.into();
        let costs = self.costs.get(&name).copied().unwrap_or_default();
        self.fallbacks.push(ChatClient {
            name,
            provider,
            costs,
        });
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Send a request through the pool.
    ///
    /// Order of business: the primary chain (each client admitted by
    /// the rate limiter under its own name, then retried on transient
    /// failures with exponential backoff), then the fallback chain. The
    /// first success wins.
    pub async fn send(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<PoolReply, EngineError> {
        let mut last_error = EngineError::NonTransientProvider("No chat clients configured".into());

        match self
            .try_chain(&self.primaries, self.load_balancing, &self.primary_cursor, true, messages, tools)
            .await
        {
            ChainOutcome::Answered(reply) => return Ok(reply),
            ChainOutcome::Diverted => {
                tracing::debug!("Primary pool rate limited, trying fallback clients");
            }
            ChainOutcome::Exhausted(Some(e)) => last_error = e,
            ChainOutcome::Exhausted(None) => {}
        }

        match self
            .try_chain(&self.fallbacks, self.fallback_mode, &self.fallback_cursor, false, messages, tools)
            .await
        {
            ChainOutcome::Answered(reply) => {
                tracing::info!(client = %reply.client_name, "Fallback client answered");
                Ok(reply)
            }
            ChainOutcome::Exhausted(Some(e)) => Err(e),
            ChainOutcome::Diverted | ChainOutcome::Exhausted(None) => Err(last_error),
        }
    }

    /// Try every client in the chain once, in balanced order. Each
    /// client is admitted by the rate limiter under its own name before
    /// dispatch, then retried on transient failures. A `Fallback`
    /// verdict stops a divertible chain; a rejected client is skipped.
    async fn try_chain(
        &self,
        clients: &[ChatClient],
        mode: LoadBalancingMode,
        cursor: &AtomicUsize,
        can_divert: bool,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> ChainOutcome {
        if clients.is_empty() {
            return ChainOutcome::Exhausted(None);
        }

        let start = self.start_index(clients.len(), mode, cursor);
        let mut last_error = None;

        for offset in 0..clients.len() {
            let client = &clients[(start + offset) % clients.len()];

            // Holds any concurrency permit for the duration of the dispatch.
            let mut _permit = None;
            if let Some(limiter) = &self.rate_limiter {
                match limiter.acquire(&client.name).await {
                    Ok(RateLimitDecision::Admitted(permit)) => _permit = permit,
                    Ok(RateLimitDecision::Fallback) if can_divert => {
                        return ChainOutcome::Diverted;
                    }
                    Ok(RateLimitDecision::Fallback) => {
                        tracing::warn!(client = %client.name, "Rate limited with nowhere left to divert");
                        last_error = Some(EngineError::RateLimitDenied(format!(
                            "client '{}' is rate limited",
                            client.name
                        )));
                        continue;
                    }
                    Ok(RateLimitDecision::Rejected(reason)) => {
                        tracing::warn!(client = %client.name, %reason, "Rate limited");
                        last_error = Some(EngineError::RateLimitDenied(reason));
                        continue;
                    }
                    Err(e) => {
                        last_error = Some(EngineError::TransientProvider(e.to_string()));
                        continue;
                    }
                }
            }

            match self.try_client(client, messages, tools).await {
                Ok(reply) => return ChainOutcome::Answered(reply),
                Err(e) => {
                    tracing::warn!(client = %client.name, error = %e, "Client exhausted");
                    last_error = Some(e);
                }
            }
        }
        ChainOutcome::Exhausted(last_error)
    }

    /// One client, up to `max_retry_attempts` tries. Non-transient
    /// failures abort immediately so the chain can move on.
    async fn try_client(
        &self,
        client: &ChatClient,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<PoolReply, EngineError> {
        let mut attempt = 1;
        loop {
            match client.provider.send(messages, tools).await {
                Ok(reply) => {
                    let mut usage = reply.usage;
                    usage.cost = client
                        .costs
                        .price(usage.prompt_tokens, usage.completion_tokens);
                    self.record_usage(&client.name, &usage);
                    return Ok(PoolReply {
                        reply,
                        client_name: client.name.clone(),
                        usage,
                    });
                }
                Err(e) if e.is_transient() && attempt < self.max_retry_attempts => {
                    let delay = retry_delay(self.retry_base_delay_seconds, attempt);
                    tracing::debug!(
                        client = %client.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(map_provider_error(e)),
            }
        }
    }

    fn start_index(&self, len: usize, mode: LoadBalancingMode, cursor: &AtomicUsize) -> usize {
        match mode {
            LoadBalancingMode::None => 0,
            LoadBalancingMode::Sequential | LoadBalancingMode::RoundRobin => {
                cursor.fetch_add(1, Ordering::Relaxed) % len
            }
            LoadBalancingMode::Random => rand::thread_rng().gen_range(0..len),
        }
    }

    fn record_usage(&self, client_name: &str, usage: &TokenUsage) {
        let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        ledger.entry(client_name.to_string()).or_default().add(usage);
    }

    /// Accumulated usage per client since pool creation
    pub fn usage_by_client(&self) -> HashMap<String, TokenUsage> {
        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Accumulated usage across all clients
    pub fn total_usage(&self) -> TokenUsage {
        let ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        let mut total = TokenUsage::default();
        for usage in ledger.values() {
            total.add(usage);
        }
        total
    }
}

fn map_provider_error(e: ProviderError) -> EngineError {
    match e {
        ProviderError::Transient(msg) => EngineError::TransientProvider(msg),
        ProviderError::Timeout => EngineError::TransientProvider("provider timed out".into()),
        ProviderError::NonTransient(msg) => EngineError::NonTransientProvider(msg),
    }
}

// -- Tests --------------------------------------------------------------
