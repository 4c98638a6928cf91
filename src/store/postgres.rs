//! PostgreSQL product store backed by a lazily connected sqlx pool.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use super::{ProductStore, StoreError, StoreResult};
use crate::models::{Product, ProductFields};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL,
    price       DOUBLE PRECISION NOT NULL,
    description TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const COLUMNS: &str = "id, name, price, description, created_at, updated_at";

/// Products table in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    /// Builds the pool without connecting, so the service can start (and
    /// report itself unhealthy) while the database is down.
    pub fn connect_lazy(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    /// Creates the products table if it does not exist.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        info!("Products table ready");
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn find_all(&self) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY id", COLUMNS);
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn create(&self, fields: ProductFields) -> StoreResult<Product> {
        let sql = format!(
            "INSERT INTO products (name, price, description) VALUES ($1, $2, $3) RETURNING {}",
            COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(fields.name)
            .bind(fields.price)
            .bind(fields.description)
            .fetch_one(&self.pool)
            .await?;
        Ok(product)
    }

    async fn update(&self, id: i64, fields: ProductFields) -> StoreResult<Product> {
        let sql = format!(
            "UPDATE products SET name = $2, price = $3, description = $4, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            COLUMNS
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(fields.name)
            .bind(fields.price)
            .bind(fields.description)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> StoreResult<Product> {
        let sql = format!("DELETE FROM products WHERE id = $1 RETURNING {}", COLUMNS);
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
