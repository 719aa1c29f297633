//! Engine configuration.
//!
//! Every component takes its configuration explicitly at construction —
//! there are no process-wide settings objects. All structs are serde
//! round-trippable so the infrastructure layer can populate them from
//! TOML files.

use serde::{Deserialize, Serialize};
use stagecraft_domain::{CacheBehavior, ExecutionMode};
use std::collections::HashMap;

/// How a client is picked from a pool of interchangeable providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingMode {
    /// Always the first configured client
    #[default]
    None,
    /// Rotate a shared cursor across calls
    Sequential,
    /// Alias of Sequential kept for config compatibility
    RoundRobin,
    /// Uniform random pick
    Random,
}

/// What happens when the rate limiter denies an acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitBehavior {
    /// Block the caller (with an overall timeout) until capacity frees
    #[default]
    Wait,
    /// Fail fast
    Reject,
    /// Redirect the caller to the fallback client chain
    Fallback,
}

/// Admission-control algorithm with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum RateLimitingStrategy {
    TokenBucket {
        capacity: f64,
        refill_per_second: f64,
    },
    FixedWindow {
        limit: u64,
        window_seconds: u64,
    },
    SlidingWindow {
        limit: u64,
        window_seconds: u64,
    },
    Concurrent {
        max_concurrent: u64,
    },
}

impl Default for RateLimitingStrategy {
    fn default() -> Self {
        RateLimitingStrategy::TokenBucket {
            capacity: 10.0,
            refill_per_second: 1.0,
        }
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub strategy: RateLimitingStrategy,
    pub behavior: RateLimitBehavior,
    /// Overall bound on `RateLimitBehavior::Wait` blocking
    pub wait_timeout_seconds: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            strategy: RateLimitingStrategy::default(),
            behavior: RateLimitBehavior::default(),
            wait_timeout_seconds: 30.0,
        }
    }
}

/// Per-client token pricing, applied by the chat client pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenCostSettings {
    pub prompt_cost_per_1k: f64,
    pub completion_cost_per_1k: f64,
}

impl TokenCostSettings {
    pub fn free() -> Self {
        Self::default()
    }

    /// Price a raw token count pair
    pub fn price(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 / 1000.0) * self.prompt_cost_per_1k
            + (completion_tokens as f64 / 1000.0) * self.completion_cost_per_1k
    }
}

/// Chat client pool configuration.
///
/// Primary and fallback are disjoint named lists; the names refer to
/// registered provider clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub primary_clients: Vec<String>,
    pub fallback_clients: Vec<String>,
    pub load_balancing: LoadBalancingMode,
    pub fallback_mode: LoadBalancingMode,
    pub max_retry_attempts: u32,
    pub retry_base_delay_seconds: f64,
    /// Per-client cost settings, keyed by client name
    pub costs: HashMap<String, TokenCostSettings>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            primary_clients: Vec::new(),
            fallback_clients: Vec::new(),
            load_balancing: LoadBalancingMode::default(),
            fallback_mode: LoadBalancingMode::default(),
            max_retry_attempts: 3,
            retry_base_delay_seconds: 1.0,
            costs: HashMap::new(),
        }
    }
}

/// Execution loop bounds and defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub default_mode: ExecutionMode,
    /// Upper bound on plan length in Planning mode
    pub max_recursion_depth: usize,
    /// Upper bound on director-driven re-executions in DynamicChaining
    pub max_re_executions: u32,
    /// Upper bound on model↔tool turns within one scene
    pub max_tool_turns: u32,
    /// Timeout for one server-side actor invocation
    pub tool_timeout_seconds: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_mode: ExecutionMode::Direct,
            max_recursion_depth: 4,
            max_re_executions: 5,
            max_tool_turns: 8,
            tool_timeout_seconds: 30,
        }
    }
}

/// Cache service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Namespace prepended to every key
    pub key_prefix: String,
    /// TTL applied under `CacheBehavior::Default`
    pub default_ttl_seconds: u64,
    pub behavior: CacheBehavior,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: "stagecraft".to_string(),
            default_ttl_seconds: 300,
            behavior: CacheBehavior::Default,
        }
    }
}

/// Summarizer thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeConfig {
    /// Compact once the history exceeds this many characters
    pub character_threshold: usize,
    /// Compact once this many assistant responses accumulated
    pub response_count_threshold: usize,
    /// Turns preserved verbatim at the tail
    pub keep_recent_turns: usize,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            character_threshold: 8_000,
            response_count_threshold: 10,
            keep_recent_turns: 4,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub execution: ExecutionConfig,
    pub pool: PoolConfig,
    pub rate_limit: Option<RateLimitConfig>,
    pub cache: CacheConfig,
    pub summarize: SummarizeConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert_eq!(config.execution.default_mode, ExecutionMode::Direct);
        assert_eq!(config.pool.max_retry_attempts, 3);
        assert!((config.pool.retry_base_delay_seconds - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.cache.key_prefix, "stagecraft");
        assert!(config.rate_limit.is_none());
    }

    #[test]
    fn cost_pricing() {
        let costs = TokenCostSettings {
            prompt_cost_per_1k: 0.5,
            completion_cost_per_1k: 1.0,
        };
        // 2000 prompt + 1000 completion = 2*0.5 + 1*1.0
        assert!((costs.price(2000, 1000) - 2.0).abs() < 1e-9);
        assert!((TokenCostSettings::free().price(5000, 5000)).abs() < f64::EPSILON);
    }

    #[test]
    fn strategy_round_trips_through_toml_shaped_json() {
        let config = RateLimitConfig {
            strategy: RateLimitingStrategy::SlidingWindow {
                limit: 20,
                window_seconds: 60,
            },
            behavior: RateLimitBehavior::Fallback,
            wait_timeout_seconds: 5.0,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: RateLimitConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
