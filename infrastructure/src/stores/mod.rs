//! In-memory adapters for the application layer's storage ports.

mod memory_cache;
mod memory_rate_limit;

pub use memory_cache::MemoryCacheStore;
pub use memory_rate_limit::MemoryRateLimitStore;
