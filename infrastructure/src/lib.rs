//! Infrastructure layer: adapters for the application layer's ports.
//!
//! Provides the in-memory storage backends and the TOML configuration
//! loader. Provider adapters and actor executors are expected from the
//! embedding application, since they are deployment-specific.

pub mod config;
pub mod stores;

pub use config::{ConfigLoadError, ConfigLoader, ConfigValidationError, FileConfig};
pub use stores::{MemoryCacheStore, MemoryRateLimitStore};
