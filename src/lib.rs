//! Catalog Cache - a product catalog service with a fault-isolated cache
//!
//! Reads go through a cache-aside layer backed by Redis or an in-memory
//! store; writes hit the record store and invalidate affected keys. Cache
//! failures only ever cost latency.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use catalog::{CachePolicy, CatalogError, CatalogService};
pub use config::Config;
pub use health::{HealthReport, HealthReporter};
pub use store::{MemoryProductStore, PgProductStore, ProductStore};
pub use tasks::spawn_cleanup_task;
