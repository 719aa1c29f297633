//! Application layer: orchestration flows, ports and resilience.
//!
//! Depends on the domain layer only; everything effectful is reached
//! through the ports defined here, with adapters supplied by the
//! infrastructure layer or by the embedding application.

pub mod cache;
pub mod config;
pub mod ports;
pub mod resilience;
pub mod use_cases;

pub use cache::CacheService;
pub use config::{
    CacheConfig, EngineConfig, ExecutionConfig, LoadBalancingMode, PoolConfig, RateLimitBehavior,
    RateLimitConfig, RateLimitingStrategy, SummarizeConfig, TokenCostSettings,
};
pub use ports::{
    ActorError, ActorExecutorPort, AdmissionVerdict, CacheStoreError, CacheStorePort,
    ChatProviderPort, ProviderError, ProviderStream, ProviderStreamEvent, RateLimitState,
    RateLimitStoreError, RateLimitStorePort, StateMutator, ToolDescriptor,
};
pub use resilience::{ChatClientPool, PoolReply, RateLimiter};
pub use use_cases::{SceneManager, SceneStream};
