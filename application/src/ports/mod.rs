//! Ports (interfaces) consumed by the application layer.
//!
//! Following the Ports and Adapters pattern: ports are defined here,
//! adapters live in the infrastructure layer (or outside this core
//! entirely, for model providers and actors).

pub mod actor_executor;
pub mod cache_store;
pub mod chat_provider;
pub mod rate_limit_store;

pub use actor_executor::{ActorError, ActorExecutorPort};
pub use cache_store::{CacheStoreError, CacheStorePort};
pub use chat_provider::{
    ChatProviderPort, ProviderError, ProviderStream, ProviderStreamEvent, ToolDescriptor,
};
pub use rate_limit_store::{
    AdmissionVerdict, RateLimitState, RateLimitStoreError, RateLimitStorePort, StateMutator,
};
