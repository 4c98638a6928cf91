//! Property-Based Tests for the Catalog Service
//!
//! Drives the same random operation sequence through services wired to a
//! working cache, a disabled cache, and a cache that fails every call, and
//! checks that all three agree with each other and with a plain model.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;

use crate::cache::{
    BackendError, BackendResult, BackendStatus, CacheBackend, CacheHandle, MemoryBackend,
    SafeCache, DEFAULT_OP_TIMEOUT,
};
use crate::catalog::{CachePolicy, CatalogError, CatalogService};
use crate::models::{Product, ProductFields, ProductInput};
use crate::store::MemoryProductStore;

// == Test Backend ==
#[derive(Debug)]
struct AlwaysDown;

#[async_trait]
impl CacheBackend for AlwaysDown {
    async fn get(&self, _key: &str) -> BackendResult<Option<Vec<u8>>> {
        Err(BackendError::Unavailable("down".to_string()))
    }

    async fn set_with_ttl(&self, _key: &str, _value: &[u8], _ttl: Duration) -> BackendResult<()> {
        Err(BackendError::Unavailable("down".to_string()))
    }

    async fn delete_many(&self, _keys: &[String]) -> BackendResult<u64> {
        Err(BackendError::Timeout("down".to_string()))
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::Disconnected
    }

    fn name(&self) -> &'static str {
        "always-down"
    }
}

fn service_with(handle: CacheHandle) -> CatalogService {
    CatalogService::new(
        Arc::new(MemoryProductStore::new()),
        SafeCache::new(handle, DEFAULT_OP_TIMEOUT),
        CachePolicy::default(),
    )
}

// == Strategies ==
#[derive(Debug, Clone)]
enum Op {
    Create { name: String, price: u32 },
    Update { id: i64, name: String, price: u32 },
    Delete { id: i64 },
    Get { id: i64 },
    List,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let name = "[A-Za-z]{0,8}";
    // price 0 and empty names exercise validation
    let price = 0u32..50;
    let id = 1i64..8;
    prop_oneof![
        (name, price.clone()).prop_map(|(name, price)| Op::Create { name, price }),
        (id.clone(), name, price).prop_map(|(id, name, price)| Op::Update { id, name, price }),
        id.clone().prop_map(|id| Op::Delete { id }),
        id.prop_map(|id| Op::Get { id }),
        Just(Op::List),
    ]
}

/// Comparable outcome of one operation (timestamps stripped).
#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    One(i64, String, f64),
    Many(Vec<(i64, String, f64)>),
    Invalid,
    NotFound,
}

fn summarize(p: &Product) -> (i64, String, f64) {
    (p.id, p.name.clone(), p.price)
}

fn to_outcome<T>(result: Result<T, CatalogError>, f: impl FnOnce(T) -> Outcome) -> Outcome {
    match result {
        Ok(value) => f(value),
        Err(CatalogError::InvalidInput(_)) => Outcome::Invalid,
        Err(CatalogError::NotFound(_)) => Outcome::NotFound,
        Err(CatalogError::Store(e)) => panic!("memory store failed: {}", e),
    }
}

fn input(name: &str, price: u32) -> ProductInput {
    ProductFields::new(name, price as f64, "desc").into()
}

async fn apply(service: &CatalogService, op: &Op) -> Outcome {
    let one = |p: Product| Outcome::One(p.id, p.name, p.price);
    match op {
        Op::Create { name, price } => {
            to_outcome(service.create_product(&input(name, *price)).await, one)
        }
        Op::Update { id, name, price } => {
            to_outcome(service.update_product(*id, &input(name, *price)).await, one)
        }
        Op::Delete { id } => to_outcome(service.delete_product(*id).await, one),
        Op::Get { id } => to_outcome(service.get_product(*id).await, one),
        Op::List => to_outcome(service.list_products().await, |ps| {
            Outcome::Many(ps.iter().map(summarize).collect())
        }),
    }
}

/// Reference behaviour: a map with no cache at all.
#[derive(Default)]
struct Model {
    rows: BTreeMap<i64, (String, f64)>,
    last_id: i64,
}

impl Model {
    fn apply(&mut self, op: &Op) -> Outcome {
        let valid = |name: &str, price: u32| !name.is_empty() && price > 0;
        match op {
            Op::Create { name, price } => {
                if !valid(name, *price) {
                    return Outcome::Invalid;
                }
                self.last_id += 1;
                self.rows.insert(self.last_id, (name.clone(), *price as f64));
                Outcome::One(self.last_id, name.clone(), *price as f64)
            }
            Op::Update { id, name, price } => {
                if !valid(name, *price) {
                    return Outcome::Invalid;
                }
                match self.rows.get_mut(id) {
                    Some(row) => {
                        *row = (name.clone(), *price as f64);
                        Outcome::One(*id, name.clone(), *price as f64)
                    }
                    None => Outcome::NotFound,
                }
            }
            Op::Delete { id } => match self.rows.remove(id) {
                Some((name, price)) => Outcome::One(*id, name, price),
                None => Outcome::NotFound,
            },
            Op::Get { id } => match self.rows.get(id) {
                Some((name, price)) => Outcome::One(*id, name.clone(), *price),
                None => Outcome::NotFound,
            },
            Op::List => Outcome::Many(
                self.rows
                    .iter()
                    .map(|(id, (name, price))| (*id, name.clone(), *price))
                    .collect(),
            ),
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // For any operation sequence, a working cache, a disabled cache and a
    // failing cache all produce the outcomes of a cache-free model.
    #[test]
    fn prop_cache_never_changes_outcomes(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let rt = runtime();
        rt.block_on(async {
            let cached = service_with(CacheHandle::connected(MemoryBackend::new(100)));
            let disabled = service_with(CacheHandle::Disabled);
            let failing = service_with(CacheHandle::connected(AlwaysDown));
            let mut model = Model::default();

            for op in &ops {
                let expected = model.apply(op);
                prop_assert_eq!(&apply(&cached, op).await, &expected, "cached diverged on {:?}", op);
                prop_assert_eq!(&apply(&disabled, op).await, &expected, "disabled diverged on {:?}", op);
                prop_assert_eq!(&apply(&failing, op).await, &expected, "failing diverged on {:?}", op);
            }
            Ok(())
        })?;
    }

    // Two reads with no mutation in between return identical payloads.
    #[test]
    fn prop_repeated_get_is_idempotent(names in prop::collection::vec("[a-z]{1,6}", 1..6), pick in 0usize..6) {
        let rt = runtime();
        rt.block_on(async {
            let service = service_with(CacheHandle::connected(MemoryBackend::new(100)));
            for name in &names {
                service.create_product(&input(name, 5)).await.unwrap();
            }
            let id = (pick % names.len()) as i64 + 1;

            let first = service.get_product(id).await.unwrap();
            let second = service.get_product(id).await.unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(service.cache().stats().hits, 1);
            Ok(())
        })?;
    }
}
