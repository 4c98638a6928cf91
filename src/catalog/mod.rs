//! Catalog Module
//!
//! The cache-aside coordinator for product reads and writes.

mod service;

#[cfg(test)]
mod property_tests;

pub use service::{CachePolicy, CatalogError, CatalogResult, CatalogService};
