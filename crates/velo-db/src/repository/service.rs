//! # Service Repository
//!
//! Service records, billed with a sale or on their own.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use velo_core::{Service, ServiceStatus};

const SERVICE_COLUMNS: &str = r#"
    id, shop_id, sale_id, repair_job_id, invoice_number, name, description,
    price_cents, cost_price_cents, quantity, discount_cents, total_cents,
    payment_method, customer_name, customer_phone, actor_id, status, notes,
    created_at, updated_at
"#;

pub(crate) async fn insert_service(conn: &mut SqliteConnection, service: &Service) -> DbResult<()> {
    let sql = format!(
        "INSERT INTO services ({SERVICE_COLUMNS}) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
    );

    sqlx::query(&sql)
        .bind(&service.id)
        .bind(&service.shop_id)
        .bind(&service.sale_id)
        .bind(&service.repair_job_id)
        .bind(&service.invoice_number)
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.price_cents)
        .bind(service.cost_price_cents)
        .bind(service.quantity)
        .bind(service.discount_cents)
        .bind(service.total_cents)
        .bind(service.payment_method)
        .bind(&service.customer_name)
        .bind(&service.customer_phone)
        .bind(&service.actor_id)
        .bind(service.status)
        .bind(&service.notes)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&mut *conn)
        .await?;

    debug!(
        service_id = %service.id,
        invoice_number = %service.invoice_number,
        sale_id = ?service.sale_id,
        "Inserted service"
    );
    Ok(())
}

pub(crate) async fn fetch_service(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Service>> {
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1 AND shop_id = ?2");
    let service = sqlx::query_as::<_, Service>(&sql)
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(service)
}

/// Services billed with a sale, in creation order.
pub(crate) async fn list_for_sale(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<Service>> {
    let sql = format!(
        "SELECT {SERVICE_COLUMNS} FROM services WHERE sale_id = ?1 ORDER BY rowid"
    );
    let services = sqlx::query_as::<_, Service>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(services)
}

pub(crate) async fn update_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: ServiceStatus,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("UPDATE services SET status = ?1, notes = ?2, updated_at = ?3 WHERE id = ?4")
        .bind(status)
        .bind(notes)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
