//! # Return Processor
//!
//! Item returns and full returns against a completed sale.
//!
//! ## Item Return
//! ```text
//!  load sale ── ensure_returnable ── find item ── plan_item_return
//!       │
//!       ▼
//!  returned_quantity += n     conditional: never past quantity
//!  restock product            manual items skip this
//!  sale_returns row           amount = price × n − prorated discount
//!  status CAS                 completed → partially_returned → returned
//! ```
//!
//! A full return restocks every outstanding unit and sets the returned
//! amount to the sale total.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::PosResult;
use crate::inventory;
use crate::pool::Database;
use crate::repository::sale as sale_rows;
use velo_core::returns::{ensure_returnable, plan_full_return, plan_item_return, ItemReturn};
use velo_core::sale::{ReturnRecord, StatusChange};
use velo_core::{ActorContext, CoreError, Money, Sale, SaleStatus};

#[derive(Debug, Clone)]
pub struct ReturnManager {
    db: Database,
}

impl ReturnManager {
    pub fn new(db: Database) -> Self {
        ReturnManager { db }
    }

    /// Returns `quantity` units of one item.
    ///
    /// ## Errors
    /// - `SaleNotFound`, `ItemNotFound`
    /// - `InvalidSaleStatus` when the sale is cancelled or fully returned
    /// - `OverReturn` when fewer than `quantity` units are outstanding
    pub async fn return_item(
        &self,
        actor: &ActorContext,
        sale_id: &str,
        item_id: &str,
        quantity: i64,
        reason: Option<&str>,
    ) -> PosResult<Sale> {
        let mut uow = self.db.begin_unit("return_item").await?;
        let result = return_item_in(uow.conn(), actor, sale_id, item_id, quantity, reason).await;
        let sale = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            invoice_number = %sale.invoice_number,
            item_id = %item_id,
            quantity,
            status = %sale.status,
            returned = %sale.returned_amount(),
            "Item returned"
        );
        Ok(sale)
    }

    /// Returns everything still outstanding on the sale.
    pub async fn return_full(
        &self,
        actor: &ActorContext,
        sale_id: &str,
        reason: Option<&str>,
    ) -> PosResult<Sale> {
        let mut uow = self.db.begin_unit("return_full").await?;
        let result = return_full_in(uow.conn(), actor, sale_id, reason).await;
        let sale = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            invoice_number = %sale.invoice_number,
            returned = %sale.returned_amount(),
            "Sale fully returned"
        );
        Ok(sale)
    }
}

async fn load(conn: &mut SqliteConnection, actor: &ActorContext, sale_id: &str) -> PosResult<Sale> {
    let sale = sale_rows::fetch_sale(conn, &actor.shop_id, sale_id)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
    Ok(sale)
}

async fn return_item_in(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    sale_id: &str,
    item_id: &str,
    quantity: i64,
    reason: Option<&str>,
) -> PosResult<Sale> {
    let now = Utc::now();
    let mut sale = load(conn, actor, sale_id).await?;
    ensure_returnable(&sale)?;

    let item = sale.item(item_id).ok_or_else(|| CoreError::ItemNotFound {
        sale_id: sale.id.clone(),
        item_id: item_id.to_string(),
    })?;
    let planned = plan_item_return(item, quantity)?;

    apply_return(conn, actor, &sale, &planned, reason, now).await?;

    if let Some(item) = sale.items.iter_mut().find(|item| item.id == planned.item_id) {
        item.returned_quantity += planned.quantity;
    }
    let returned = sale.returned_amount() + planned.amount;
    let status = sale.derived_status();
    set_status(conn, actor, &mut sale, status, returned, reason, now).await?;

    load(conn, actor, sale_id).await
}

async fn return_full_in(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    sale_id: &str,
    reason: Option<&str>,
) -> PosResult<Sale> {
    let now = Utc::now();
    let mut sale = load(conn, actor, sale_id).await?;

    for planned in plan_full_return(&sale)? {
        apply_return(conn, actor, &sale, &planned, reason, now).await?;
    }

    let total = sale.total();
    set_status(conn, actor, &mut sale, SaleStatus::Returned, total, reason, now).await?;

    load(conn, actor, sale_id).await
}

/// Writes one planned item return: quantity, stock and history row.
async fn apply_return(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    sale: &Sale,
    planned: &ItemReturn,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> PosResult<()> {
    if !sale_rows::add_returned_quantity(conn, &planned.item_id, planned.quantity).await? {
        let available = sale
            .item(&planned.item_id)
            .map_or(0, |item| item.returnable());
        return Err(CoreError::OverReturn {
            item: planned.item_name.clone(),
            available,
            requested: planned.quantity,
        }
        .into());
    }

    if let Some(product_id) = planned.restock.as_deref() {
        let restocked = inventory::increment(conn, &sale.shop_id, product_id, planned.quantity).await?;
        if !restocked {
            warn!(
                sale_id = %sale.id,
                item_id = %planned.item_id,
                product_id = %product_id,
                "Returned item's product is gone, refund recorded without restock"
            );
        }
    }

    sale_rows::insert_return(
        conn,
        &ReturnRecord {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            item_id: planned.item_id.clone(),
            item_name: planned.item_name.clone(),
            quantity: planned.quantity,
            amount_cents: planned.amount.cents(),
            reason: reason.map(str::to_string),
            actor_id: actor.user_id.clone(),
            returned_at: now,
        },
    )
    .await?;
    Ok(())
}

/// Writes the sale's new status and returned amount, guarded on the
/// status it was read with. A history row is added when the status moves.
async fn set_status(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    sale: &mut Sale,
    status: SaleStatus,
    returned: Money,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> PosResult<()> {
    let updated =
        sale_rows::update_status(conn, &sale.id, sale.status, status, returned.cents(), now).await?;
    if !updated {
        return Err(CoreError::InvalidSaleStatus {
            invoice_number: sale.invoice_number.clone(),
            status: sale.status.to_string(),
            operation: "accept returns".to_string(),
        }
        .into());
    }

    if status != sale.status {
        sale_rows::insert_status_change(
            conn,
            &StatusChange {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                status,
                reason: reason.map(str::to_string),
                actor_id: actor.user_id.clone(),
                changed_at: now,
            },
        )
        .await?;
    }

    sale.status = status;
    sale.returned_amount_cents = returned.cents();
    Ok(())
}
