//! # Sequence Allocator
//!
//! Allocates invoice and job numbers from one counter per
//! `(shop, prefix, day)`:
//!
//! ```text
//!   next_number(conn, shop)
//!        │
//!        ▼
//!   INSERT INTO number_sequences ... ON CONFLICT DO UPDATE last_value + 1
//!   RETURNING last_value
//!        │   first allocation of the day seeds the counter from the
//!        │   highest number already present in sales / repair_jobs
//!        ▼
//!   "VEL9A-20261014-0007"
//! ```
//!
//! The upsert is a single statement on the caller's unit of work, so a
//! rolled-back sale also gives its number back. The counter row itself is
//! the serialization point across processes; the unique indexes on
//! `sales(shop_id, invoice_number)` and `repair_jobs(shop_id, job_number)`
//! catch anything that slips past it.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, PosResult};
use crate::repository::shop::fetch_shop;
use velo_core::numbering;
use velo_core::CoreError;

/// Allocates the next number for `shop_id` on the UTC calendar day of
/// `now`.
///
/// With `allow_fallback`, a failing counter yields a timestamp-based
/// `INV-…` number instead of aborting the unit of work.
pub async fn next_number(
    conn: &mut SqliteConnection,
    shop_id: &str,
    now: DateTime<Utc>,
    allow_fallback: bool,
) -> PosResult<String> {
    let shop = fetch_shop(conn, shop_id)
        .await?
        .ok_or_else(|| CoreError::ShopNotFound(shop_id.to_string()))?;

    let prefix = shop.number_prefix();
    let date_key = numbering::date_key(now.date_naive());

    match allocate(conn, shop_id, &prefix, &date_key).await {
        Ok(sequence) => {
            let number = numbering::format_number(&prefix, &date_key, sequence);
            debug!(shop_id = %shop_id, number = %number, "Allocated number");
            Ok(number)
        }
        Err(err) if allow_fallback => {
            let entropy = (Uuid::new_v4().as_u128() % 1000) as u16;
            let number = numbering::fallback_number(now, entropy);
            warn!(
                shop_id = %shop_id,
                error = %err,
                number = %number,
                "Sequence counter unavailable, using fallback number"
            );
            Ok(number)
        }
        Err(err) => Err(err.into()),
    }
}

async fn allocate(
    conn: &mut SqliteConnection,
    shop_id: &str,
    prefix: &str,
    date_key: &str,
) -> Result<i64, DbError> {
    let stem = numbering::number_stem(prefix, date_key);

    // Numbers issued before the counter existed (or by an older build)
    // are honoured: the seed is one past the highest one for the day.
    // GLOB is case-sensitive and keeps fallback `INV-…` numbers out.
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO number_sequences (shop_id, prefix, date_key, last_value)
        VALUES (?1, ?2, ?3, (
            SELECT COALESCE(MAX(seq), 0) + 1 FROM (
                SELECT CAST(substr(invoice_number, length(?4) + 1) AS INTEGER) AS seq
                  FROM sales
                 WHERE shop_id = ?1 AND invoice_number GLOB ?4 || '[0-9]*'
                UNION ALL
                SELECT CAST(substr(job_number, length(?4) + 1) AS INTEGER)
                  FROM repair_jobs
                 WHERE shop_id = ?1 AND job_number GLOB ?4 || '[0-9]*'
            )
        ))
        ON CONFLICT (shop_id, prefix, date_key)
        DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(shop_id)
    .bind(prefix)
    .bind(date_key)
    .bind(&stem)
    .fetch_one(&mut *conn)
    .await?;

    Ok(value)
}
