//! # Sale Repository
//!
//! Row-level reads and writes for sales, their items and their history.
//! Every function runs on a connection handed in by the caller, normally
//! the connection of an open [`crate::UnitOfWork`].
//!
//! ## Sale Document Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales                ◄── one row per sale, header + totals            │
//! │    ├── sale_items     ◄── kind = product | manual, cart order          │
//! │    ├── sale_returns   ◄── one row per accepted return                  │
//! │    └── sale_status_history                                              │
//! │                                                                         │
//! │  fetch_sale() reassembles all four into one velo_core::Sale            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use velo_core::sale::{ReturnRecord, SaleLine, StatusChange};
use velo_core::{PaymentMethod, Sale, SaleItem, SaleStatus};

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    shop_id: String,
    invoice_number: String,
    customer_id: Option<String>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    subtotal_cents: i64,
    discount_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    payment_method: PaymentMethod,
    payment_details: Option<String>,
    status: SaleStatus,
    returned_amount_cents: i64,
    actor_id: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    id: String,
    sale_id: String,
    position: i64,
    kind: String,
    product_id: Option<String>,
    name: String,
    quantity: i64,
    unit_price_cents: i64,
    cost_price_cents: i64,
    discount_cents: i64,
    returned_quantity: i64,
}

impl TryFrom<SaleItemRow> for SaleItem {
    type Error = DbError;

    fn try_from(row: SaleItemRow) -> Result<Self, Self::Error> {
        let line = match (row.kind.as_str(), row.product_id) {
            ("product", Some(product_id)) => SaleLine::Product {
                product_id,
                cost_price_cents: row.cost_price_cents,
            },
            ("manual", None) => SaleLine::Manual,
            (kind, _) => {
                return Err(DbError::corrupt(
                    "sale_item",
                    format!("item {} has kind '{kind}' with mismatched product", row.id),
                ))
            }
        };

        Ok(SaleItem {
            id: row.id,
            sale_id: row.sale_id,
            position: row.position,
            line,
            name: row.name,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            discount_cents: row.discount_cents,
            returned_quantity: row.returned_quantity,
        })
    }
}

/// Inserts the sale header and all of its items.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    let payment_details = sale
        .payment_details
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DbError::Internal(format!("payment details: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, shop_id, invoice_number, customer_id, customer_name, customer_phone,
            subtotal_cents, discount_cents, tax_cents, total_cents,
            payment_method, payment_details, status, returned_amount_cents,
            actor_id, notes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.shop_id)
    .bind(&sale.invoice_number)
    .bind(&sale.customer_id)
    .bind(&sale.customer_name)
    .bind(&sale.customer_phone)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(payment_details)
    .bind(sale.status)
    .bind(sale.returned_amount_cents)
    .bind(&sale.actor_id)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in &sale.items {
        insert_item(conn, item).await?;
    }

    debug!(
        sale_id = %sale.id,
        invoice_number = %sale.invoice_number,
        items = sale.items.len(),
        "Inserted sale"
    );
    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    let (kind, product_id, cost_price_cents) = match &item.line {
        SaleLine::Product {
            product_id,
            cost_price_cents,
        } => ("product", Some(product_id.as_str()), *cost_price_cents),
        SaleLine::Manual => ("manual", None, 0),
    };

    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, position, kind, product_id, name, quantity,
            unit_price_cents, cost_price_cents, discount_cents, returned_quantity
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(item.position)
    .bind(kind)
    .bind(product_id)
    .bind(&item.name)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(cost_price_cents)
    .bind(item.discount_cents)
    .bind(item.returned_quantity)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Loads a sale with items and history. `None` if it isn't in the shop.
pub(crate) async fn fetch_sale(
    conn: &mut SqliteConnection,
    shop_id: &str,
    sale_id: &str,
) -> DbResult<Option<Sale>> {
    let row = sqlx::query_as::<_, SaleRow>(
        r#"
        SELECT id, shop_id, invoice_number, customer_id, customer_name, customer_phone,
               subtotal_cents, discount_cents, tax_cents, total_cents,
               payment_method, payment_details, status, returned_amount_cents,
               actor_id, notes, created_at, updated_at
        FROM sales
        WHERE id = ?1 AND shop_id = ?2
        "#,
    )
    .bind(sale_id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, SaleItemRow>(
        r#"
        SELECT id, sale_id, position, kind, product_id, name, quantity,
               unit_price_cents, cost_price_cents, discount_cents, returned_quantity
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY position
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(SaleItem::try_from)
    .collect::<DbResult<Vec<_>>>()?;

    let return_history = sqlx::query_as::<_, ReturnRecord>(
        r#"
        SELECT id, sale_id, item_id, item_name, quantity, amount_cents, reason, actor_id, returned_at
        FROM sale_returns
        WHERE sale_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    let status_history = sqlx::query_as::<_, StatusChange>(
        r#"
        SELECT id, sale_id, status, reason, actor_id, changed_at
        FROM sale_status_history
        WHERE sale_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    let payment_details = row
        .payment_details
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| DbError::corrupt("sale", format!("payment details of {}: {e}", row.id)))?;

    Ok(Some(Sale {
        id: row.id,
        shop_id: row.shop_id,
        invoice_number: row.invoice_number,
        customer_id: row.customer_id,
        customer_name: row.customer_name,
        customer_phone: row.customer_phone,
        items,
        subtotal_cents: row.subtotal_cents,
        discount_cents: row.discount_cents,
        tax_cents: row.tax_cents,
        total_cents: row.total_cents,
        payment_method: row.payment_method,
        payment_details,
        status: row.status,
        returned_amount_cents: row.returned_amount_cents,
        actor_id: row.actor_id,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
        return_history,
        status_history,
    }))
}

/// Adds `quantity` to an item's returned units unless that would exceed
/// the units sold. Returns whether the row was updated.
pub(crate) async fn add_returned_quantity(
    conn: &mut SqliteConnection,
    item_id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sale_items
        SET returned_quantity = returned_quantity + ?1
        WHERE id = ?2 AND returned_quantity + ?1 <= quantity
        "#,
    )
    .bind(quantity)
    .bind(item_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn insert_return(conn: &mut SqliteConnection, record: &ReturnRecord) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_returns (
            id, sale_id, item_id, item_name, quantity, amount_cents, reason, actor_id, returned_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&record.id)
    .bind(&record.sale_id)
    .bind(&record.item_id)
    .bind(&record.item_name)
    .bind(record.quantity)
    .bind(record.amount_cents)
    .bind(&record.reason)
    .bind(&record.actor_id)
    .bind(record.returned_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_status_change(
    conn: &mut SqliteConnection,
    change: &StatusChange,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_status_history (id, sale_id, status, reason, actor_id, changed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&change.id)
    .bind(&change.sale_id)
    .bind(change.status)
    .bind(&change.reason)
    .bind(&change.actor_id)
    .bind(change.changed_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes a new status and returned amount, guarded on the status the
/// caller read. Returns whether the row was updated.
pub(crate) async fn update_status(
    conn: &mut SqliteConnection,
    sale_id: &str,
    expected: SaleStatus,
    status: SaleStatus,
    returned_amount_cents: i64,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sales
        SET status = ?1, returned_amount_cents = ?2, updated_at = ?3
        WHERE id = ?4 AND status = ?5
        "#,
    )
    .bind(status)
    .bind(returned_amount_cents)
    .bind(now)
    .bind(sale_id)
    .bind(expected)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
