//! In-Memory Backend Module
//!
//! Process-local cache backend: a HashMap of expiring entries with LRU
//! eviction once the configured capacity is reached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::cache::backend::{BackendResult, BackendStatus, CacheBackend};
use crate::cache::{CacheEntry, LruTracker};

// == Memory Store ==
/// The synchronous storage behind [`MemoryBackend`].
#[derive(Debug)]
pub struct MemoryStore {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    max_entries: usize,
    evictions: u64,
}

impl MemoryStore {
    /// Creates an empty store holding at most `max_entries` (minimum 1).
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            max_entries: max_entries.max(1),
            evictions: 0,
        }
    }

    // == Set ==
    /// Stores a value, resetting its TTL if the key already exists.
    ///
    /// Inserting a new key into a full store evicts the least recently used
    /// entry first.
    pub fn set(&mut self, key: &str, value: Vec<u8>, ttl: Duration) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.evictions += 1;
            }
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        self.lru.touch(key);
    }

    // == Get ==
    /// Returns a clone of the value if present and unexpired.
    ///
    /// An expired entry is removed on access.
    pub fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        let expired = self.entries.get(key)?.is_expired();
        if expired {
            self.entries.remove(key);
            self.lru.remove(key);
            return None;
        }

        self.lru.touch(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Delete ==
    /// Removes a key. Returns whether an unexpired entry was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        match self.entries.remove(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        }
    }

    // == Cleanup Expired ==
    /// Drops every expired entry and returns how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.lru.remove(key);
        }
        expired.len()
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}

// == Memory Backend ==
/// Shared handle to a [`MemoryStore`]; clones see the same entries.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryBackend {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(max_entries))),
        }
    }

    /// Sweeps expired entries. Called by the background cleanup task.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Whether `key` currently holds an unexpired entry.
    pub async fn contains_key(&self, key: &str) -> bool {
        self.store
            .read()
            .await
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        // Write lock: expired entries are removed and recency is updated.
        Ok(self.store.write().await.get(key))
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> BackendResult<()> {
        self.store.write().await.set(key, value.to_vec(), ttl);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> BackendResult<u64> {
        let mut store = self.store.write().await;
        let removed = keys.iter().filter(|key| store.delete(key)).count();
        Ok(removed as u64)
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::Connected
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
