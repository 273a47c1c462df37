//! # Repair-to-Sale Conversion
//!
//! Bills a completed repair job exactly once.
//!
//! ```text
//!  begin_unit("convert_repair_job")
//!    load job ── plan_billing() ── JobNotCompleted / JobAlreadyBilled
//!    next_number
//!    insert sale (parts as items, stock NOT decremented again)
//!    claim job   ── CAS sale_id IS NULL AND status = completed
//!                   lost the race → JobAlreadyBilled, sale rolled back
//!  commit
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::error::PosResult;
use crate::pool::Database;
use crate::repository::product::fetch_product;
use crate::repository::{repair_job, sale as sale_rows};
use crate::sequence;
use velo_core::cart::GoodsLine;
use velo_core::conversion::{plan_billing, ReceiptLine};
use velo_core::{
    ActorContext, CoreError, JobStatus, PaymentMethod, RepairJob, Sale, SaleItem, SaleLine,
    SaleStatus,
};

/// Result of billing a repair job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub sale: Sale,
    /// The job after billing.
    pub job: RepairJob,
    /// Services and labor for the receipt. Not stored as sale items.
    pub receipt_lines: Vec<ReceiptLine>,
    pub services_subtotal_cents: i64,
}

#[derive(Debug, Clone)]
pub struct ConversionManager {
    db: Database,
}

impl ConversionManager {
    pub fn new(db: Database) -> Self {
        ConversionManager { db }
    }

    pub async fn convert_repair_job_to_sale(
        &self,
        actor: &ActorContext,
        job_id: &str,
        payment_method: &str,
        payment_details: Option<serde_json::Value>,
    ) -> PosResult<Conversion> {
        let payment_method: PaymentMethod = payment_method.parse()?;

        let mut uow = self.db.begin_unit("convert_repair_job").await?;
        let result = convert_in(
            uow.conn(),
            actor,
            job_id,
            payment_method,
            payment_details,
            self.db.numbering_fallback(),
        )
        .await;
        let conversion = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            job_number = %conversion.job.job_number,
            invoice_number = %conversion.sale.invoice_number,
            total = %conversion.sale.total(),
            "Repair job converted to sale"
        );
        Ok(conversion)
    }
}

async fn convert_in(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    job_id: &str,
    payment_method: PaymentMethod,
    payment_details: Option<serde_json::Value>,
    allow_fallback: bool,
) -> PosResult<Conversion> {
    let now = Utc::now();
    let shop_id = actor.shop_id.as_str();

    let mut job = repair_job::fetch_job(conn, shop_id, job_id)
        .await?
        .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;
    let plan = plan_billing(&job)?;

    let invoice_number = sequence::next_number(conn, shop_id, now, allow_fallback).await?;
    let sale_id = Uuid::new_v4().to_string();

    let mut items = Vec::with_capacity(plan.goods.len());
    for (position, (line, part)) in plan.goods.iter().zip(&job.parts).enumerate() {
        let line = match line {
            // A product deleted since the part was added keeps its id on
            // the item with a zero cost snapshot.
            GoodsLine::Product(p) => SaleLine::Product {
                product_id: p.product_id.clone(),
                cost_price_cents: fetch_product(conn, shop_id, &p.product_id)
                    .await?
                    .map_or(0, |product| product.cost_cents),
            },
            GoodsLine::Manual(_) => SaleLine::Manual,
        };
        items.push(SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            position: position as i64,
            line,
            name: part.name.clone(),
            quantity: part.quantity,
            unit_price_cents: part.unit_price_cents,
            discount_cents: 0,
            returned_quantity: 0,
        });
    }

    let sale = Sale {
        id: sale_id,
        shop_id: shop_id.to_string(),
        invoice_number,
        customer_id: None,
        customer_name: Some(plan.customer_name),
        customer_phone: plan.customer_phone,
        items,
        subtotal_cents: plan.subtotal.cents(),
        discount_cents: 0,
        tax_cents: 0,
        total_cents: plan.total.cents(),
        payment_method,
        payment_details,
        status: SaleStatus::Completed,
        returned_amount_cents: 0,
        actor_id: actor.user_id.clone(),
        notes: Some(plan.notes),
        created_at: now,
        updated_at: now,
        return_history: Vec::new(),
        status_history: Vec::new(),
    };
    sale_rows::insert_sale(conn, &sale).await?;

    let claimed =
        repair_job::claim_for_sale(conn, shop_id, &job.id, &sale.id, &[JobStatus::Completed], now)
            .await?;
    if !claimed {
        return Err(CoreError::JobAlreadyBilled {
            job_number: job.job_number,
        }
        .into());
    }
    job.mark_billed(&sale.id, now);

    Ok(Conversion {
        sale,
        job,
        receipt_lines: plan.receipt_lines,
        services_subtotal_cents: plan.services_subtotal.cents(),
    })
}
