//! API Module
//!
//! HTTP handlers and routing for the product catalog REST API.
//!
//! # Endpoints
//! - `GET|POST /api/products`
//! - `GET|PUT|DELETE /api/products/:id`
//! - `GET /api/health`
//! - `GET /api/cache/stats`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
