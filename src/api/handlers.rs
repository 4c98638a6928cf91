//! API Handlers
//!
//! HTTP request handlers for each catalog endpoint. Handlers only parse
//! input and map outcomes; caching decisions live in [`CatalogService`].

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::cache::{CacheHandle, MemoryBackend, RedisBackend, SafeCache};
use crate::catalog::{CachePolicy, CatalogService};
use crate::config::{CacheBackendKind, Config};
use crate::error::{ApiError, Result};
use crate::health::{HealthReport, HealthReporter};
use crate::models::{Product, ProductInput, StatsResponse};
use crate::store::ProductStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub health: HealthReporter,
}

impl AppState {
    /// Wires a store and a cache handle together.
    pub fn new(
        store: Arc<dyn ProductStore>,
        cache: SafeCache,
        policy: CachePolicy,
        version: impl Into<String>,
    ) -> Self {
        let health = HealthReporter::new(Arc::clone(&store), cache.handle().clone(), version);
        Self {
            catalog: CatalogService::new(store, cache, policy),
            health,
        }
    }

    /// Builds the state from configuration.
    ///
    /// Returns the in-memory backend too when one was created, so the caller
    /// can run its cleanup task. Never connects to Redis here.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn ProductStore>,
    ) -> anyhow::Result<(Self, Option<MemoryBackend>)> {
        let cache_config = &config.cache;
        let mut memory = None;

        let handle = if !cache_config.enabled {
            CacheHandle::Disabled
        } else {
            match cache_config.backend {
                CacheBackendKind::Redis => {
                    CacheHandle::connected(RedisBackend::new(&cache_config.redis)?)
                }
                CacheBackendKind::Memory => {
                    let backend = MemoryBackend::new(cache_config.max_entries);
                    memory = Some(backend.clone());
                    CacheHandle::connected(backend)
                }
            }
        };

        let cache = SafeCache::new(handle, cache_config.op_timeout);
        let state = Self::new(store, cache, cache_config.policy, config.app_version.clone());
        Ok((state, memory))
    }
}

/// Parses the `:id` segment. Non-integers are rejected before any lookup.
fn parse_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::InvalidInput("Invalid product ID".to_string()))
}

fn parse_body(
    body: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<ProductInput> {
    body.map(|Json(input)| input)
        .map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))
}

/// Handler for GET /api/products
pub async fn list_products_handler(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    state
        .catalog
        .list_products()
        .await
        .map(Json)
        .map_err(|e| ApiError::from_catalog(e, "Failed to fetch products"))
}

/// Handler for POST /api/products
pub async fn create_product_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<Product>> {
    let input = parse_body(body)?;
    state
        .catalog
        .create_product(&input)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_catalog(e, "Failed to create product"))
}

/// Handler for GET /api/products/:id
pub async fn get_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let id = parse_id(&id)?;
    state
        .catalog
        .get_product(id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_catalog(e, "Failed to fetch product"))
}

/// Handler for PUT /api/products/:id
pub async fn update_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<Product>> {
    let id = parse_id(&id)?;
    let input = parse_body(body)?;
    state
        .catalog
        .update_product(id, &input)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_catalog(e, "Failed to update product"))
}

/// Handler for DELETE /api/products/:id
///
/// Responds with the deleted product.
pub async fn delete_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let id = parse_id(&id)?;
    state
        .catalog
        .delete_product(id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_catalog(e, "Failed to delete product"))
}

/// Handler for GET /api/health
///
/// 200 when the store answers, 503 otherwise. Cache state never affects the
/// status code.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health.probe().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// Handler for GET /api/cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.catalog.cache();
    Json(StatsResponse::new(cache.handle(), cache.stats()))
}
