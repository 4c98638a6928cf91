//! Cache Module
//!
//! The cache side of the cache-aside layer: backend adapters (Redis and
//! in-process), the fault-isolating [`SafeCache`] wrapper, and the key
//! families the service uses.

mod backend;
mod backoff;
mod entry;
mod lru;
mod memory;
mod redis_cache;
mod safe;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::{BackendError, BackendResult, BackendStatus, CacheBackend, CacheHandle};
pub use backoff::BackoffPolicy;
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use memory::{MemoryBackend, MemoryStore};
pub use redis_cache::{RedisBackend, RedisSettings};
pub use safe::{SafeCache, DEFAULT_OP_TIMEOUT};
pub use stats::{CacheStats, CacheStatsSnapshot};

// == Cache Keys ==
/// Key of the cached full product listing.
pub const COLLECTION_KEY: &str = "collection:all";

/// Key of one cached product.
pub fn record_key(id: i64) -> String {
    format!("record:{}", id)
}
