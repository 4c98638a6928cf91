//! Catalog Service
//!
//! Cache-aside coordination for products. Reads try the cache, fall back to
//! the store on any miss and repopulate the cache; writes go to the store
//! first and invalidate the affected cache keys afterwards.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{record_key, SafeCache, COLLECTION_KEY};
use crate::models::{Product, ProductInput};
use crate::store::{ProductStore, StoreError};

// == Catalog Error ==
/// Outcome of a failed catalog operation.
///
/// Cache problems never show up here.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Missing or malformed fields. Nothing was read or written.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Product {0} not found")]
    NotFound(i64),

    /// Unexpected store failure
    #[error("Store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CatalogError::NotFound(id),
            other => CatalogError::Store(other),
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

// == Cache Policy ==
/// Expiry applied when populating each key family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub record_ttl: Duration,
    pub collection_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            record_ttl: Duration::from_secs(600),
            collection_ttl: Duration::from_secs(600),
        }
    }
}

// == Catalog Service ==
/// Entry point for the five product operations.
///
/// Cheap to clone; clones share the store and the cache connection.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ProductStore>,
    cache: SafeCache,
    policy: CachePolicy,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ProductStore>, cache: SafeCache, policy: CachePolicy) -> Self {
        Self {
            store,
            cache,
            policy,
        }
    }

    pub fn cache(&self) -> &SafeCache {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn ProductStore> {
        &self.store
    }

    // == Reads ==
    /// Returns one product, from cache when possible.
    ///
    /// A cached value is trusted for its TTL. A miss for an unknown id
    /// caches nothing.
    pub async fn get_product(&self, id: i64) -> CatalogResult<Product> {
        let key = record_key(id);
        if let Some(product) = self.read_cached::<Product>(&key).await {
            return Ok(product);
        }

        debug!(id, "Fetching product from store");
        let product = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        self.populate(&key, &product, self.policy.record_ttl).await;
        Ok(product)
    }

    /// Returns every product, from cache when possible.
    pub async fn list_products(&self) -> CatalogResult<Vec<Product>> {
        if let Some(products) = self.read_cached::<Vec<Product>>(COLLECTION_KEY).await {
            return Ok(products);
        }

        debug!("Fetching product list from store");
        let products = self.store.find_all().await?;

        self.populate(COLLECTION_KEY, &products, self.policy.collection_ttl)
            .await;
        Ok(products)
    }

    // == Writes ==
    /// Creates a product and drops the cached listing.
    pub async fn create_product(&self, input: &ProductInput) -> CatalogResult<Product> {
        let fields = input.validate().map_err(CatalogError::InvalidInput)?;

        let product = self.store.create(fields).await?;
        info!(id = product.id, "Product created");

        // No record key can exist yet for a fresh id.
        self.cache.invalidate(vec![COLLECTION_KEY.to_string()]).await;
        Ok(product)
    }

    /// Replaces a product's fields and drops its cached copy and the listing.
    pub async fn update_product(&self, id: i64, input: &ProductInput) -> CatalogResult<Product> {
        let fields = input.validate().map_err(CatalogError::InvalidInput)?;

        let product = self.store.update(id, fields).await?;
        info!(id, "Product updated");

        self.invalidate_product(id).await;
        Ok(product)
    }

    /// Deletes a product and returns its last state.
    pub async fn delete_product(&self, id: i64) -> CatalogResult<Product> {
        let product = self.store.delete(id).await?;
        info!(id, "Product deleted");

        self.invalidate_product(id).await;
        Ok(product)
    }

    // == Cache Steps ==
    /// Reads and decodes a cached value. Undecodable payloads count as misses.
    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.cache.get(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Best-effort write of a freshly fetched value.
    async fn populate<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.cache.set(key, bytes, ttl).await;
            }
            Err(e) => warn!(key, error = %e, "Failed to encode value for cache"),
        }
    }

    /// Runs after the store mutation has returned.
    async fn invalidate_product(&self, id: i64) {
        self.cache
            .invalidate(vec![record_key(id), COLLECTION_KEY.to_string()])
            .await;
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("store", &self.store.name())
            .field("cache", &self.cache.handle())
            .field("policy", &self.policy)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBackend, CacheHandle, MemoryBackend, DEFAULT_OP_TIMEOUT};
    use crate::models::ProductFields;
    use crate::store::MemoryProductStore;

    struct Fixture {
        service: CatalogService,
        backend: MemoryBackend,
        store: MemoryProductStore,
    }

    fn fixture() -> Fixture {
        let backend = MemoryBackend::new(100);
        let store = MemoryProductStore::new();
        let cache = SafeCache::new(CacheHandle::connected(backend.clone()), DEFAULT_OP_TIMEOUT);
        let service = CatalogService::new(Arc::new(store.clone()), cache, CachePolicy::default());
        Fixture {
            service,
            backend,
            store,
        }
    }

    fn input(name: &str, price: f64) -> ProductInput {
        ProductFields::new(name, price, "d").into()
    }

    #[tokio::test]
    async fn test_get_populates_record_key() {
        let fx = fixture();
        let created = fx.service.create_product(&input("A", 10.0)).await.unwrap();

        let fetched = fx.service.get_product(created.id).await.unwrap();

        assert_eq!(fetched, created);
        assert!(fx.backend.contains_key(&record_key(created.id)).await);
    }

    #[tokio::test]
    async fn test_cached_value_short_circuits_store() {
        let fx = fixture();
        let created = fx.service.create_product(&input("A", 10.0)).await.unwrap();
        fx.service.get_product(created.id).await.unwrap();

        // Change the store behind the cache's back.
        fx.store
            .update(created.id, ProductFields::new("Z", 99.0, "d"))
            .await
            .unwrap();

        let served = fx.service.get_product(created.id).await.unwrap();
        assert_eq!(served.name, "A", "cached value is trusted for its TTL");
    }

    #[tokio::test]
    async fn test_missing_id_caches_nothing() {
        let fx = fixture();

        let result = fx.service.get_product(42).await;

        assert!(matches!(result, Err(CatalogError::NotFound(42))));
        assert!(fx.backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_input_touches_nothing() {
        let fx = fixture();
        fx.service.list_products().await.unwrap();

        let result = fx.service.create_product(&ProductInput::default()).await;

        assert!(matches!(result, Err(CatalogError::InvalidInput(_))));
        assert!(fx.store.find_all().await.unwrap().is_empty());
        assert!(fx.backend.contains_key(COLLECTION_KEY).await, "listing not invalidated");
    }

    #[tokio::test]
    async fn test_create_invalidates_listing() {
        let fx = fixture();
        assert!(fx.service.list_products().await.unwrap().is_empty());

        fx.service.create_product(&input("A", 10.0)).await.unwrap();

        assert!(!fx.backend.contains_key(COLLECTION_KEY).await);
        assert_eq!(fx.service.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_invalidates_both_keys() {
        let fx = fixture();
        let created = fx.service.create_product(&input("A", 10.0)).await.unwrap();
        fx.service.get_product(created.id).await.unwrap();
        fx.service.list_products().await.unwrap();

        let updated = fx
            .service
            .update_product(created.id, &input("B", 20.0))
            .await
            .unwrap();

        assert!(!fx.backend.contains_key(&record_key(created.id)).await);
        assert!(!fx.backend.contains_key(COLLECTION_KEY).await);
        assert_eq!(fx.service.get_product(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let fx = fixture();
        let result = fx.service.update_product(5, &input("B", 20.0)).await;
        assert!(matches!(result, Err(CatalogError::NotFound(5))));
    }

    #[tokio::test]
    async fn test_delete_returns_last_state_and_invalidates() {
        let fx = fixture();
        let created = fx.service.create_product(&input("A", 10.0)).await.unwrap();
        fx.service.get_product(created.id).await.unwrap();

        let deleted = fx.service.delete_product(created.id).await.unwrap();

        assert_eq!(deleted, created);
        assert!(matches!(
            fx.service.get_product(created.id).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_treated_as_miss() {
        let fx = fixture();
        let created = fx.service.create_product(&input("A", 10.0)).await.unwrap();
        fx.backend
            .set_with_ttl(&record_key(created.id), b"not json", Duration::from_secs(60))
            .await
            .unwrap();

        let fetched = fx.service.get_product(created.id).await.unwrap();

        assert_eq!(fetched, created);
        let repaired = fx.backend.get(&record_key(created.id)).await.unwrap().unwrap();
        assert_eq!(serde_json::from_slice::<Product>(&repaired).unwrap(), created);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collection_entry_expires_after_ttl() {
        let fx = fixture();
        fx.service.list_products().await.unwrap();
        assert!(fx.backend.contains_key(COLLECTION_KEY).await);

        tokio::time::advance(CachePolicy::default().collection_ttl).await;

        assert!(!fx.backend.contains_key(COLLECTION_KEY).await);
    }

    #[tokio::test]
    async fn test_disabled_cache_serves_from_store() {
        let store = MemoryProductStore::new();
        let service = CatalogService::new(
            Arc::new(store),
            SafeCache::disabled(),
            CachePolicy::default(),
        );

        let created = service.create_product(&input("A", 10.0)).await.unwrap();
        assert_eq!(service.get_product(created.id).await.unwrap(), created);
        assert_eq!(service.list_products().await.unwrap(), vec![created]);
        assert_eq!(service.cache().stats().hits, 0);
    }
}
