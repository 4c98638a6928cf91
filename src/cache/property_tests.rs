//! Property-Based Tests for the In-Memory Backend
//!
//! Runs random set/get/delete sequences against [`MemoryStore`] and a plain
//! LRU model, and checks the safe wrapper's counters.

use proptest::prelude::*;
use std::collections::VecDeque;
use std::time::Duration;

use crate::cache::{CacheHandle, MemoryBackend, MemoryStore, SafeCache, DEFAULT_OP_TIMEOUT};

const TTL: Duration = Duration::from_secs(300);

// == Strategies ==
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Vec<u8> },
    Get { key: String },
    Delete { key: String },
}

/// Small key space so operations collide often.
fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (1i64..6).prop_map(crate::cache::record_key),
        Just(crate::cache::COLLECTION_KEY.to_string()),
    ]
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), prop::collection::vec(any::<u8>(), 0..32))
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

/// Reference LRU: front is least recently used.
struct Model {
    entries: VecDeque<(String, Vec<u8>)>,
    capacity: usize,
    evictions: u64,
}

impl Model {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            evictions: 0,
        }
    }

    fn take(&mut self, key: &str) -> Option<(String, Vec<u8>)> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        self.entries.remove(pos)
    }

    fn set(&mut self, key: &str, value: Vec<u8>) {
        if self.take(key).is_none() && self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evictions += 1;
        }
        self.entries.push_back((key.to_string(), value));
    }

    fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        let entry = self.take(key)?;
        let value = entry.1.clone();
        self.entries.push_back(entry);
        Some(value)
    }

    fn delete(&mut self, key: &str) -> bool {
        self.take(key).is_some()
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any operation sequence, the store returns what an LRU model with
    // the same capacity returns, and never exceeds that capacity.
    #[test]
    fn prop_store_matches_lru_model(
        capacity in 1usize..5,
        ops in prop::collection::vec(cache_op_strategy(), 1..60),
    ) {
        let mut store = MemoryStore::new(capacity);
        let mut model = Model::new(capacity);

        for op in &ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(key, value.clone(), TTL);
                    model.set(key, value.clone());
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(store.get(key), model.get(key), "get {}", key);
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(store.delete(key), model.delete(key), "delete {}", key);
                }
            }
            prop_assert!(store.len() <= capacity);
            prop_assert_eq!(store.len(), model.entries.len());
        }

        prop_assert_eq!(store.evictions(), model.evictions);
    }

    // Hits plus misses equals the number of reads, and hits are exactly the
    // reads that found a value.
    #[test]
    fn prop_safe_cache_counts_reads(ops in prop::collection::vec(cache_op_strategy(), 1..40)) {
        let rt = runtime();
        rt.block_on(async {
            let cache = SafeCache::new(
                CacheHandle::connected(MemoryBackend::new(100)),
                DEFAULT_OP_TIMEOUT,
            );
            let mut reads = 0u64;
            let mut found = 0u64;

            for op in &ops {
                match op {
                    CacheOp::Set { key, value } => {
                        prop_assert!(cache.set(key, value.clone(), TTL).await);
                    }
                    CacheOp::Get { key } => {
                        reads += 1;
                        if cache.get(key).await.is_some() {
                            found += 1;
                        }
                    }
                    CacheOp::Delete { key } => {
                        cache.invalidate(vec![key.clone()]).await;
                    }
                }
            }

            let stats = cache.stats();
            prop_assert_eq!(stats.hits, found);
            prop_assert_eq!(stats.hits + stats.misses, reads);
            prop_assert_eq!(stats.failures, 0);
            Ok(())
        })?;
    }
}
