//! # Inventory Ledger
//!
//! The only code that changes `products.quantity`.
//!
//! ```text
//!   decrement(shop, product, n)
//!        │
//!        ▼
//!   UPDATE products SET quantity = quantity - n
//!    WHERE id = ? AND shop_id = ? AND quantity >= n
//!        │
//!        ├── 1 row  → Ok(product after the write)
//!        └── 0 rows → re-read: missing          → ProductNotFoundInShop
//!                              present          → InsufficientStock
//! ```
//!
//! The guard lives in the `WHERE` clause, so two units of work can never
//! both take the last unit: whichever writes second sees the lowered
//! quantity.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::error::PosResult;
use crate::repository::product::fetch_product;
use velo_core::{CoreError, Product};

/// Takes `quantity` units out of stock.
///
/// Runs on the caller's unit of work and returns the product as it stands
/// after the decrement.
pub async fn decrement(
    conn: &mut SqliteConnection,
    shop_id: &str,
    product_id: &str,
    quantity: i64,
) -> PosResult<Product> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity - ?1, updated_at = ?2
        WHERE id = ?3 AND shop_id = ?4 AND quantity >= ?1
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .bind(shop_id)
    .execute(&mut *conn)
    .await?;

    let product = fetch_product(conn, shop_id, product_id).await?.ok_or_else(|| {
        CoreError::ProductNotFoundInShop {
            product_id: product_id.to_string(),
        }
    })?;

    if result.rows_affected() == 0 {
        debug!(
            product_id = %product_id,
            available = product.quantity,
            requested = quantity,
            "Stock decrement refused"
        );
        return Err(CoreError::InsufficientStock {
            product: product.name,
            available: product.quantity,
            requested: quantity,
        }
        .into());
    }

    debug!(product_id = %product_id, quantity, remaining = product.quantity, "Stock decremented");
    Ok(product)
}

/// Puts `quantity` units back.
///
/// Returns `false` when the product no longer exists in the shop; the
/// caller's refund still stands, there is just nothing to restock.
pub async fn increment(
    conn: &mut SqliteConnection,
    shop_id: &str,
    product_id: &str,
    quantity: i64,
) -> PosResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity + ?1, updated_at = ?2
        WHERE id = ?3 AND shop_id = ?4
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .bind(shop_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(product_id = %product_id, quantity, "Restock skipped: product no longer exists");
        return Ok(false);
    }

    debug!(product_id = %product_id, quantity, "Stock restored");
    Ok(true)
}
