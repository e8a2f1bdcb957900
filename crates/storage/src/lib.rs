//! Response caching for the TEMPO services.
//!
//! Provides:
//! - Deterministic cache keys derived from request parameters
//! - A Redis-backed cache that degrades to passthrough when Redis is away
//! - An in-process TTL/LRU cache for single-instance deployments and tests

pub mod cache;
pub mod cache_key;
pub mod memory_cache;

pub use cache::{CacheError, CacheResult, RedisCache, ResponseCache, LARGE_PAYLOAD_BYTES};
pub use cache_key::{CacheKey, CacheKeyCodec, CacheValue};
pub use memory_cache::{MemoryCache, MemoryCacheStats};
