//! In-memory product store, used when no database is configured and in tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ProductStore, StoreError, StoreResult};
use crate::models::{Product, ProductFields};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, Product>,
    last_id: i64,
}

/// Product table held in process memory.
///
/// Ids start at 1 and are never reused, matching a database sequence.
#[derive(Debug, Clone, Default)]
pub struct MemoryProductStore {
    table: Arc<RwLock<Table>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Product>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Product>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn create(&self, fields: ProductFields) -> StoreResult<Product> {
        let mut table = self.table.write().await;
        table.last_id += 1;

        let now = Utc::now();
        let product = Product {
            id: table.last_id,
            name: fields.name,
            price: fields.price,
            description: fields.description,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: i64, fields: ProductFields) -> StoreResult<Product> {
        let mut table = self.table.write().await;
        let product = table.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        product.name = fields.name;
        product.price = fields.price;
        product.description = fields.description;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<Product> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .ok_or(StoreError::NotFound(id))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
