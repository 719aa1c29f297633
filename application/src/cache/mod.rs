//! Result and continuation caching.

pub mod service;

pub use service::CacheService;
