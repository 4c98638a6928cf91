//! API Routes
//!
//! Configures the Axum router with all catalog endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, create_product_handler, delete_product_handler, get_product_handler,
    health_handler, list_products_handler, update_product_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/products` - List every product
/// - `POST /api/products` - Create a product
/// - `GET /api/products/:id` - Fetch one product
/// - `PUT /api/products/:id` - Replace a product's fields
/// - `DELETE /api/products/:id` - Delete a product
/// - `GET /api/health` - Store probe and process info
/// - `GET /api/cache/stats` - Cache counters
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/products",
            get(list_products_handler).post(create_product_handler),
        )
        .route(
            "/api/products/:id",
            get(get_product_handler)
                .put(update_product_handler)
                .delete(delete_product_handler),
        )
        .route("/api/health", get(health_handler))
        .route("/api/cache/stats", get(cache_stats_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
