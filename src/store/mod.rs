//! Record Store Module
//!
//! The system of record for products. Stores know nothing about caching;
//! [`crate::catalog::CatalogService`] layers the cache on top.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::{Product, ProductFields};

pub use memory::MemoryProductStore;
pub use postgres::PgProductStore;

// == Store Error ==
#[derive(Error, Debug)]
pub enum StoreError {
    /// No product with this id
    #[error("Product {0} not found")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Product Store Trait ==
/// Authoritative CRUD access to products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Product>>;

    /// Every product, ordered by id.
    async fn find_all(&self) -> StoreResult<Vec<Product>>;

    /// Inserts a product and returns it with its assigned id.
    async fn create(&self, fields: ProductFields) -> StoreResult<Product>;

    /// Replaces the attributes of an existing product.
    ///
    /// Fails with [`StoreError::NotFound`] if `id` does not exist.
    async fn update(&self, id: i64, fields: ProductFields) -> StoreResult<Product>;

    /// Removes a product and returns its last state.
    ///
    /// Fails with [`StoreError::NotFound`] if `id` does not exist.
    async fn delete(&self, id: i64) -> StoreResult<Product>;

    /// Cheapest possible round trip, used by the health probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Short store name for logs.
    fn name(&self) -> &'static str;
}

// == Seed Data ==
/// Demo catalog inserted by [`seed`].
pub fn demo_products() -> Vec<ProductFields> {
    vec![
        ProductFields::new(
            "Laptop ASUS TUF",
            12_000_000.0,
            "Gaming laptop with an Intel i5 and an RTX 3050",
        ),
        ProductFields::new(
            "Mechanical Keyboard",
            750_000.0,
            "Blue-switch mechanical keyboard with RGB lighting",
        ),
        ProductFields::new(
            "Monitor 24 inch",
            1_800_000.0,
            "Full HD 144Hz IPS monitor for gaming and work",
        ),
        ProductFields::new(
            "Wireless Mouse",
            250_000.0,
            "Ergonomic wireless mouse with long battery life",
        ),
        ProductFields::new(
            "Gaming Headset",
            550_000.0,
            "7.1 surround headset with a noise-cancelling mic",
        ),
    ]
}

/// Inserts the demo catalog if the store is empty.
///
/// Returns the number of products inserted.
pub async fn seed(store: &dyn ProductStore) -> StoreResult<usize> {
    if !store.find_all().await?.is_empty() {
        info!("Store already has products, skipping seed");
        return Ok(0);
    }

    let products = demo_products();
    let count = products.len();
    for fields in products {
        store.create(fields).await?;
    }
    info!(count, "Seeded demo products");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_only_fills_empty_store() {
        let store = MemoryProductStore::new();

        assert_eq!(seed(&store).await.unwrap(), 5);
        assert_eq!(seed(&store).await.unwrap(), 0);
        assert_eq!(store.find_all().await.unwrap().len(), 5);
    }

    #[test]
    fn test_demo_products_are_valid() {
        for fields in demo_products() {
            let input = crate::models::ProductInput::from(fields.clone());
            assert_eq!(input.validate(), Ok(fields));
        }
    }
}
