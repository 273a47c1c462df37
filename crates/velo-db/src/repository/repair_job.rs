//! # Repair Job Repository
//!
//! A repair job is stored as a header row in `repair_jobs` plus one child
//! table per charge list. Child rows are append-only; the header carries
//! the recomputed totals and the status.
//!
//! ```text
//!   repair_jobs ─┬─ repair_job_parts
//!                ├─ repair_job_labor
//!                ├─ repair_job_services
//!                └─ repair_job_notes
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use velo_core::repair::{
    EquipmentItem, JobCustomer, JobNote, JobService, LaborEntry, LaborHours, Part,
};
use velo_core::{JobStatus, JobType, Priority, RepairJob};

const JOB_COLUMNS: &str = r#"
    id, shop_id, job_number, job_type,
    customer_name, customer_phone, customer_email,
    item_type, item_brand, item_model, item_year, item_color, item_serial_number,
    description, status, priority, estimated_cost_cents,
    estimated_completion_date, actual_completion_date,
    total_cost_cents, deposit_cents, remaining_balance_cents,
    sale_id, assigned_to, created_by, created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct RepairJobRow {
    id: String,
    shop_id: String,
    job_number: String,
    job_type: JobType,
    customer_name: String,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    item_type: Option<String>,
    item_brand: Option<String>,
    item_model: Option<String>,
    item_year: Option<String>,
    item_color: Option<String>,
    item_serial_number: Option<String>,
    description: String,
    status: JobStatus,
    priority: Priority,
    estimated_cost_cents: i64,
    estimated_completion_date: Option<NaiveDate>,
    actual_completion_date: Option<DateTime<Utc>>,
    total_cost_cents: i64,
    deposit_cents: i64,
    remaining_balance_cents: i64,
    sale_id: Option<String>,
    assigned_to: Option<String>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RepairJobRow {
    fn into_job(self) -> RepairJob {
        RepairJob {
            id: self.id,
            shop_id: self.shop_id,
            job_number: self.job_number,
            job_type: self.job_type,
            customer: JobCustomer {
                name: self.customer_name,
                phone: self.customer_phone,
                email: self.customer_email,
            },
            item: EquipmentItem {
                item_type: self.item_type,
                brand: self.item_brand,
                model: self.item_model,
                year: self.item_year,
                color: self.item_color,
                serial_number: self.item_serial_number,
            },
            description: self.description,
            status: self.status,
            priority: self.priority,
            estimated_cost_cents: self.estimated_cost_cents,
            estimated_completion_date: self.estimated_completion_date,
            actual_completion_date: self.actual_completion_date,
            parts: Vec::new(),
            labor: Vec::new(),
            services: Vec::new(),
            notes: Vec::new(),
            total_cost_cents: self.total_cost_cents,
            deposit_cents: self.deposit_cents,
            remaining_balance_cents: self.remaining_balance_cents,
            sale_id: self.sale_id,
            assigned_to: self.assigned_to,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PartRow {
    id: String,
    product_id: Option<String>,
    name: String,
    quantity: i64,
    unit_price_cents: i64,
    total_price_cents: i64,
    added_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct LaborRow {
    id: String,
    description: String,
    hours_hundredths: i64,
    hourly_rate_cents: i64,
    total_cost_cents: i64,
    added_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: String,
    name: String,
    price_cents: i64,
    catalog_ref: Option<String>,
    added_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    id: String,
    text: String,
    actor_id: Option<String>,
    added_at: DateTime<Utc>,
}

/// Inserts the header and any charge rows already on the job.
pub(crate) async fn insert_job(conn: &mut SqliteConnection, job: &RepairJob) -> DbResult<()> {
    let sql = format!(
        "INSERT INTO repair_jobs ({JOB_COLUMNS}) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
          ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)"
    );

    sqlx::query(&sql)
        .bind(&job.id)
        .bind(&job.shop_id)
        .bind(&job.job_number)
        .bind(job.job_type)
        .bind(&job.customer.name)
        .bind(&job.customer.phone)
        .bind(&job.customer.email)
        .bind(&job.item.item_type)
        .bind(&job.item.brand)
        .bind(&job.item.model)
        .bind(&job.item.year)
        .bind(&job.item.color)
        .bind(&job.item.serial_number)
        .bind(&job.description)
        .bind(job.status)
        .bind(job.priority)
        .bind(job.estimated_cost_cents)
        .bind(job.estimated_completion_date)
        .bind(job.actual_completion_date)
        .bind(job.total_cost_cents)
        .bind(job.deposit_cents)
        .bind(job.remaining_balance_cents)
        .bind(&job.sale_id)
        .bind(&job.assigned_to)
        .bind(&job.created_by)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *conn)
        .await?;

    for part in &job.parts {
        insert_part(conn, &job.id, part).await?;
    }
    for labor in &job.labor {
        insert_labor(conn, &job.id, labor).await?;
    }
    for service in &job.services {
        insert_service(conn, &job.id, service).await?;
    }
    for note in &job.notes {
        insert_note(conn, &job.id, note).await?;
    }

    debug!(job_id = %job.id, job_number = %job.job_number, "Inserted repair job");
    Ok(())
}

pub(crate) async fn insert_part(conn: &mut SqliteConnection, job_id: &str, part: &Part) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO repair_job_parts (
            id, job_id, product_id, name, quantity, unit_price_cents, total_price_cents, added_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&part.id)
    .bind(job_id)
    .bind(&part.product_id)
    .bind(&part.name)
    .bind(part.quantity)
    .bind(part.unit_price_cents)
    .bind(part.total_price_cents)
    .bind(part.added_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_labor(
    conn: &mut SqliteConnection,
    job_id: &str,
    labor: &LaborEntry,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO repair_job_labor (
            id, job_id, description, hours_hundredths, hourly_rate_cents, total_cost_cents, added_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&labor.id)
    .bind(job_id)
    .bind(&labor.description)
    .bind(labor.hours.hundredths())
    .bind(labor.hourly_rate_cents)
    .bind(labor.total_cost_cents)
    .bind(labor.added_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_service(
    conn: &mut SqliteConnection,
    job_id: &str,
    service: &JobService,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO repair_job_services (id, job_id, name, price_cents, catalog_ref, added_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&service.id)
    .bind(job_id)
    .bind(&service.name)
    .bind(service.price_cents)
    .bind(&service.catalog_ref)
    .bind(service.added_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_note(conn: &mut SqliteConnection, job_id: &str, note: &JobNote) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO repair_job_notes (id, job_id, text, actor_id, added_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&note.id)
    .bind(job_id)
    .bind(&note.text)
    .bind(&note.actor_id)
    .bind(note.added_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes the header's derived fields: status, completion date, totals.
pub(crate) async fn update_header(conn: &mut SqliteConnection, job: &RepairJob) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE repair_jobs
        SET status = ?1,
            actual_completion_date = ?2,
            total_cost_cents = ?3,
            remaining_balance_cents = ?4,
            updated_at = ?5
        WHERE id = ?6 AND shop_id = ?7
        "#,
    )
    .bind(job.status)
    .bind(job.actual_completion_date)
    .bind(job.total_cost_cents)
    .bind(job.remaining_balance_cents)
    .bind(job.updated_at)
    .bind(&job.id)
    .bind(&job.shop_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Flips a job to `billed` with `sale_id`, provided no sale has claimed it
/// yet and its status is one of `from`.
///
/// Returns `false` when another unit of work got there first.
pub(crate) async fn claim_for_sale(
    conn: &mut SqliteConnection,
    shop_id: &str,
    job_id: &str,
    sale_id: &str,
    from: &[JobStatus],
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let placeholders = (0..from.len())
        .map(|i| format!("?{}", i + 5))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        r#"
        UPDATE repair_jobs
        SET status = 'billed', sale_id = ?1, updated_at = ?2
        WHERE id = ?3 AND shop_id = ?4 AND sale_id IS NULL AND status IN ({placeholders})
        "#
    );

    let mut query = sqlx::query(&sql)
        .bind(sale_id)
        .bind(now)
        .bind(job_id)
        .bind(shop_id);
    for status in from {
        query = query.bind(*status);
    }

    let result = query.execute(&mut *conn).await?;
    Ok(result.rows_affected() == 1)
}

pub(crate) async fn delete_job(conn: &mut SqliteConnection, shop_id: &str, job_id: &str) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM repair_jobs WHERE id = ?1 AND shop_id = ?2 AND status <> 'billed'")
        .bind(job_id)
        .bind(shop_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Loads a job with all charge lists. `None` if it isn't in the shop.
pub(crate) async fn fetch_job(
    conn: &mut SqliteConnection,
    shop_id: &str,
    job_id: &str,
) -> DbResult<Option<RepairJob>> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM repair_jobs WHERE id = ?1 AND shop_id = ?2");
    let row = sqlx::query_as::<_, RepairJobRow>(&sql)
        .bind(job_id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(load_children(conn, row.into_job()).await?)),
        None => Ok(None),
    }
}

/// Jobs of a shop, newest first, optionally filtered by status.
pub(crate) async fn list_jobs(
    conn: &mut SqliteConnection,
    shop_id: &str,
    status: Option<JobStatus>,
) -> DbResult<Vec<RepairJob>> {
    let rows = match status {
        Some(status) => {
            let sql = format!(
                "SELECT {JOB_COLUMNS} FROM repair_jobs WHERE shop_id = ?1 AND status = ?2 \
                 ORDER BY rowid DESC"
            );
            sqlx::query_as::<_, RepairJobRow>(&sql)
                .bind(shop_id)
                .bind(status)
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {JOB_COLUMNS} FROM repair_jobs WHERE shop_id = ?1 \
                 ORDER BY rowid DESC"
            );
            sqlx::query_as::<_, RepairJobRow>(&sql)
                .bind(shop_id)
                .fetch_all(&mut *conn)
                .await?
        }
    };

    let mut jobs = Vec::with_capacity(rows.len());
    for row in rows {
        jobs.push(load_children(conn, row.into_job()).await?);
    }
    Ok(jobs)
}

async fn load_children(conn: &mut SqliteConnection, mut job: RepairJob) -> DbResult<RepairJob> {
    job.parts = sqlx::query_as::<_, PartRow>(
        r#"
        SELECT id, product_id, name, quantity, unit_price_cents, total_price_cents, added_at
        FROM repair_job_parts WHERE job_id = ?1 ORDER BY rowid
        "#,
    )
    .bind(&job.id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|row| Part {
        id: row.id,
        product_id: row.product_id,
        name: row.name,
        quantity: row.quantity,
        unit_price_cents: row.unit_price_cents,
        total_price_cents: row.total_price_cents,
        added_at: row.added_at,
    })
    .collect();

    job.labor = sqlx::query_as::<_, LaborRow>(
        r#"
        SELECT id, description, hours_hundredths, hourly_rate_cents, total_cost_cents, added_at
        FROM repair_job_labor WHERE job_id = ?1 ORDER BY rowid
        "#,
    )
    .bind(&job.id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|row| LaborEntry {
        id: row.id,
        description: row.description,
        hours: LaborHours::from_hundredths(row.hours_hundredths),
        hourly_rate_cents: row.hourly_rate_cents,
        total_cost_cents: row.total_cost_cents,
        added_at: row.added_at,
    })
    .collect();

    job.services = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT id, name, price_cents, catalog_ref, added_at
        FROM repair_job_services WHERE job_id = ?1 ORDER BY rowid
        "#,
    )
    .bind(&job.id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|row| JobService {
        id: row.id,
        name: row.name,
        price_cents: row.price_cents,
        catalog_ref: row.catalog_ref,
        added_at: row.added_at,
    })
    .collect();

    job.notes = sqlx::query_as::<_, NoteRow>(
        r#"
        SELECT id, text, actor_id, added_at
        FROM repair_job_notes WHERE job_id = ?1 ORDER BY rowid
        "#,
    )
    .bind(&job.id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|row| JobNote {
        id: row.id,
        text: row.text,
        actor_id: row.actor_id,
        added_at: row.added_at,
    })
    .collect();

    Ok(job)
}
