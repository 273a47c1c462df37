//! # Product Repository
//!
//! Catalog reads and product creation. Stock levels are changed only by
//! the inventory ledger ([`crate::inventory`]).
//!
//! ## Shop Scoping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every lookup is keyed by (shop_id, product_id).                        │
//! │                                                                         │
//! │  get_by_id("shop-A", "p1")  ──►  Some(product)                         │
//! │  get_by_id("shop-B", "p1")  ──►  None    (exists, but not yours)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use velo_core::Product;

const PRODUCT_COLUMNS: &str =
    "id, shop_id, sku, name, price_cents, cost_cents, quantity, created_at, updated_at";

/// Fields for a new catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: Option<String>,
    pub name: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    /// Opening stock.
    pub quantity: i64,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let chain = repo.create(&shop.id, NewProduct {
///     name: "KMC X11 Chain".into(),
///     price_cents: 3499,
///     quantity: 12,
///     ..Default::default()
/// }).await?;
///
/// let same = repo.get_by_id(&shop.id, &chain.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Adds a product to a shop's catalog.
    pub async fn create(&self, shop_id: &str, input: NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            shop_id: shop_id.to_string(),
            sku: input.sku,
            name: input.name.trim().to_string(),
            price_cents: input.price_cents,
            cost_cents: input.cost_cents,
            quantity: input.quantity,
            created_at: now,
            updated_at: now,
        };

        debug!(shop_id = %shop_id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, shop_id, sku, name, price_cents, cost_cents, quantity,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.shop_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.quantity)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product of the given shop.
    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, shop_id, id).await
    }

    pub async fn get_by_sku(&self, shop_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ?1 AND sku = ?2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(shop_id)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// All products of a shop, by name.
    pub async fn list_for_shop(&self, shop_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ?1 ORDER BY name");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(shop_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(shop_id = %shop_id, count = products.len(), "Listed products");
        Ok(products)
    }

    pub async fn count(&self, shop_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE shop_id = ?1")
            .bind(shop_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Reads a product on an open connection, scoped to the shop.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND shop_id = ?2");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_products_are_shop_scoped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let north = db.shops().create("North Cycles").await.unwrap();
        let south = db.shops().create("South Cycles").await.unwrap();

        let tube = db
            .products()
            .create(
                &north.id,
                NewProduct {
                    sku: Some("TUBE-700".into()),
                    name: "700c Tube".into(),
                    price_cents: 899,
                    cost_cents: 300,
                    quantity: 20,
                },
            )
            .await
            .unwrap();

        let found = db.products().get_by_id(&north.id, &tube.id).await.unwrap();
        assert_eq!(found, Some(tube.clone()));
        assert!(db.products().get_by_id(&south.id, &tube.id).await.unwrap().is_none());

        let by_sku = db.products().get_by_sku(&north.id, "TUBE-700").await.unwrap();
        assert_eq!(by_sku.map(|p| p.id), Some(tube.id));
        assert_eq!(db.products().count(&north.id).await.unwrap(), 1);
        assert_eq!(db.products().count(&south.id).await.unwrap(), 0);
    }
}
