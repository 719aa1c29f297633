//! Raw TOML configuration data types
//!
//! These structs mirror the structure of the TOML config file. Sections
//! reuse the application layer's serde-capable config types directly;
//! validation happens here, before an `EngineConfig` is handed out.

use serde::{Deserialize, Serialize};
use stagecraft_application::config::{
    CacheConfig, EngineConfig, ExecutionConfig, PoolConfig, RateLimitConfig, RateLimitingStrategy,
    SummarizeConfig,
};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("pool client name cannot be empty")]
    EmptyClientName,

    #[error("client '{0}' appears in both primary and fallback lists")]
    OverlappingClient(String),

    #[error("max_retry_attempts cannot be 0")]
    InvalidRetryAttempts,

    #[error("rate limit parameters are invalid: {0}")]
    InvalidRateLimit(String),

    #[error("max_tool_turns cannot be 0")]
    InvalidToolTurns,
}

/// Raw top-level configuration from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub execution: ExecutionConfig,
    pub pool: PoolConfig,
    pub rate_limit: Option<RateLimitConfig>,
    pub cache: CacheConfig,
    pub summarize: SummarizeConfig,
}

impl FileConfig {
    /// Check cross-field constraints the type system cannot express
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self
            .pool
            .primary_clients
            .iter()
            .chain(self.pool.fallback_clients.iter())
            .any(|name| name.trim().is_empty())
        {
            return Err(ConfigValidationError::EmptyClientName);
        }
        for name in &self.pool.primary_clients {
            if self.pool.fallback_clients.contains(name) {
                return Err(ConfigValidationError::OverlappingClient(name.clone()));
            }
        }
        if self.pool.max_retry_attempts == 0 {
            return Err(ConfigValidationError::InvalidRetryAttempts);
        }
        if self.execution.max_tool_turns == 0 {
            return Err(ConfigValidationError::InvalidToolTurns);
        }
        if let Some(rate_limit) = &self.rate_limit {
            validate_strategy(&rate_limit.strategy)?;
        }
        Ok(())
    }

    pub fn into_engine_config(self) -> EngineConfig {
        EngineConfig {
            execution: self.execution,
            pool: self.pool,
            rate_limit: self.rate_limit,
            cache: self.cache,
            summarize: self.summarize,
        }
    }
}

fn validate_strategy(strategy: &RateLimitingStrategy) -> Result<(), ConfigValidationError> {
    match *strategy {
        RateLimitingStrategy::TokenBucket {
            capacity,
            refill_per_second,
        } => {
            if capacity < 1.0 || refill_per_second <= 0.0 {
                return Err(ConfigValidationError::InvalidRateLimit(format!(
                    "token bucket needs capacity >= 1 and a positive refill rate \
                     (got capacity {capacity}, refill {refill_per_second})"
                )));
            }
        }
        RateLimitingStrategy::FixedWindow {
            limit,
            window_seconds,
        }
        | RateLimitingStrategy::SlidingWindow {
            limit,
            window_seconds,
        } => {
            if limit == 0 || window_seconds == 0 {
                return Err(ConfigValidationError::InvalidRateLimit(
                    "window limiters need a non-zero limit and window".to_string(),
                ));
            }
        }
        RateLimitingStrategy::Concurrent { max_concurrent } => {
            if max_concurrent == 0 {
                return Err(ConfigValidationError::InvalidRateLimit(
                    "max_concurrent cannot be 0".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_application::config::RateLimitBehavior;

    #[test]
    fn defaults_validate() {
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn overlapping_client_lists_are_rejected() {
        let mut config = FileConfig::default();
        config.pool.primary_clients = vec!["openai".to_string()];
        config.pool.fallback_clients = vec!["openai".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::OverlappingClient(name)) if name == "openai"
        ));
    }

    #[test]
    fn zero_window_rate_limit_is_rejected() {
        let config = FileConfig {
            rate_limit: Some(RateLimitConfig {
                strategy: RateLimitingStrategy::FixedWindow {
                    limit: 10,
                    window_seconds: 0,
                },
                behavior: RateLimitBehavior::Reject,
                wait_timeout_seconds: 1.0,
            }),
            ..FileConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidRateLimit(_))
        ));
    }

    #[test]
    fn parses_a_full_toml_document() {
        let toml = r#"
            [execution]
            default_mode = "planning"
            max_recursion_depth = 3

            [pool]
            primary_clients = ["openai", "anthropic"]
            fallback_clients = ["local"]
            load_balancing = "round_robin"
            max_retry_attempts = 2

            [pool.costs.openai]
            prompt_cost_per_1k = 0.01
            completion_cost_per_1k = 0.03

            [rate_limit]
            behavior = "fallback"
            wait_timeout_seconds = 5.0

            [rate_limit.strategy]
            algorithm = "sliding_window"
            limit = 30
            window_seconds = 60

            [cache]
            key_prefix = "acme"
            default_ttl_seconds = 120

            [summarize]
            character_threshold = 4000
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());

        let engine = config.into_engine_config();
        assert_eq!(engine.pool.primary_clients, ["openai", "anthropic"]);
        assert_eq!(engine.cache.key_prefix, "acme");
        assert_eq!(engine.summarize.character_threshold, 4000);
        // Unset fields keep their defaults.
        assert_eq!(engine.summarize.response_count_threshold, 10);
        assert!(engine.rate_limit.is_some());
    }
}
