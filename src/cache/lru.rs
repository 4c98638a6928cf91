//! LRU Tracker Module
//!
//! Recency ordering for the in-memory backend's capacity eviction.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks key recency with a monotonically increasing access stamp.
///
/// `stamps` maps key -> stamp and `order` maps stamp -> key, so touching and
/// evicting are both logarithmic.
#[derive(Debug, Default)]
pub struct LruTracker {
    stamps: HashMap<String, u64>,
    order: BTreeMap<u64, String>,
    clock: u64,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if new.
    pub fn touch(&mut self, key: &str) {
        self.clock += 1;
        if let Some(old) = self.stamps.insert(key.to_string(), self.clock) {
            self.order.remove(&old);
        }
        self.order.insert(self.clock, key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(stamp) = self.stamps.remove(key) {
            self.order.remove(&stamp);
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}
