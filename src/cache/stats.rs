//! Cache Statistics Module
//!
//! Counters for the cache-aside layer, shared across concurrent requests.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Lock-free counters updated by [`crate::cache::SafeCache`].
///
/// A lookup that does not hit is a miss whatever the reason (absent key,
/// backend failure, or disabled cache). `failures` and `skipped` count
/// operations of every kind.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    invalidations: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds the number of keys actually removed by an invalidation.
    pub fn record_invalidations(&self, removed: u64) {
        self.invalidations.fetch_add(removed, Ordering::Relaxed);
    }

    /// A backend operation errored, timed out or panicked.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// An operation was short-circuited because the cache is disabled.
    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };

        CacheStatsSnapshot {
            hits,
            misses,
            writes: self.writes.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            hit_rate,
        }
    }
}

// == Snapshot ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub invalidations: u64,
    pub failures: u64,
    pub skipped: u64,
    /// hits / (hits + misses), 0.0 before the first lookup
    pub hit_rate: f64,
}
