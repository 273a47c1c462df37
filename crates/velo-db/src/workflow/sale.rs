//! # Sale Transaction Manager
//!
//! Turns a checkout into a persisted sale, with every side effect applied
//! in one unit of work.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout::classify()          no storage touched; bad carts stop here │
//! │       │                                                                 │
//! │       ▼  begin_unit("create_sale")                                     │
//! │  1. sequence::next_number      invoice number                          │
//! │  2. customer::resolve          savepoint, best-effort                  │
//! │  3. inventory::decrement       one per product, summed across lines    │
//! │  4. quick-service jobs         must exist in shop and be billable      │
//! │  5. insert sale + items        cost snapshot from the product row      │
//! │  6. insert services            "{invoice}-SRV", linked to the sale     │
//! │  7. claim jobs                 CAS: sale_id IS NULL → billed           │
//! │       │                                                                 │
//! │       ├── Ok  → COMMIT                                                 │
//! │       └── Err → ROLLBACK (stock, number, services, jobs all undone)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::customer;
use crate::error::{PosError, PosResult};
use crate::inventory;
use crate::pool::Database;
use crate::repository::{repair_job, sale as sale_rows, service as service_rows};
use crate::sequence;
use velo_core::cart::{Checkout, ClassifiedCart, GoodsLine, ServiceLine};
use velo_core::numbering;
use velo_core::sale::StatusChange;
use velo_core::{
    ActorContext, CoreError, JobStatus, NewService, PaymentMethod, Product, Sale, SaleDetail,
    SaleItem, SaleLine, SaleStatus, Service, ServiceStatus,
};

/// Checkout, sale lookup, cancellation and service records.
#[derive(Debug, Clone)]
pub struct SaleManager {
    db: Database,
}

impl SaleManager {
    pub fn new(db: Database) -> Self {
        SaleManager { db }
    }

    /// Creates a sale from a checkout.
    ///
    /// ## Errors
    /// - `EmptyCart`, `InvalidPaymentMethod`, `InvalidLineItem`,
    ///   `Validation` before any write
    /// - `ProductNotFoundInShop`, `InsufficientStock`, `JobNotFound`,
    ///   `JobAlreadyBilled`, `InvalidTransition` from inside the unit
    /// - `TransactionAborted` on storage failure
    ///
    /// In every error case nothing is written.
    pub async fn create_sale(
        &self,
        actor: &ActorContext,
        checkout: &Checkout,
    ) -> PosResult<SaleDetail> {
        let cart = checkout.classify()?;

        let mut uow = self.db.begin_unit("create_sale").await?;
        let result = create_in(
            uow.conn(),
            actor,
            &cart,
            checkout,
            self.db.numbering_fallback(),
        )
        .await;
        let detail = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            invoice_number = %detail.sale.invoice_number,
            total = %detail.sale.total(),
            items = detail.sale.items.len(),
            services = detail.services.len(),
            "Sale created"
        );
        Ok(detail)
    }

    /// A sale of the caller's shop with its services and customer.
    pub async fn get_sale(&self, actor: &ActorContext, sale_id: &str) -> PosResult<SaleDetail> {
        let mut conn = self.db.pool().acquire().await?;

        let sale = sale_rows::fetch_sale(&mut conn, &actor.shop_id, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        let services = service_rows::list_for_sale(&mut conn, &sale.id).await?;
        let customer = match sale.customer_id.as_deref() {
            Some(id) => customer::fetch_customer(&mut conn, &actor.shop_id, id).await?,
            None => None,
        };

        Ok(SaleDetail {
            sale,
            services,
            customer,
        })
    }

    /// Cancels a completed sale that has no returns. Stock is not touched.
    pub async fn cancel_sale(
        &self,
        actor: &ActorContext,
        sale_id: &str,
        reason: Option<&str>,
    ) -> PosResult<Sale> {
        let mut uow = self.db.begin_unit("cancel_sale").await?;
        let result = cancel_in(uow.conn(), actor, sale_id, reason).await;
        let sale = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            invoice_number = %sale.invoice_number,
            "Sale cancelled"
        );
        Ok(sale)
    }

    /// Records a service billed outside any sale.
    ///
    /// It takes its own number from the shared sequence, with the `-SRV`
    /// suffix.
    pub async fn record_service(
        &self,
        actor: &ActorContext,
        input: &NewService,
    ) -> PosResult<Service> {
        let payment_method = input.validate()?;

        let mut uow = self.db.begin_unit("record_service").await?;
        let result = record_in(
            uow.conn(),
            actor,
            input,
            payment_method,
            self.db.numbering_fallback(),
        )
        .await;
        let service = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            invoice_number = %service.invoice_number,
            total_cents = service.total_cents,
            "Service recorded"
        );
        Ok(service)
    }

    /// Sets a service's status and appends `Status change: {reason}` to
    /// its notes.
    pub async fn update_service_status(
        &self,
        actor: &ActorContext,
        service_id: &str,
        status: &str,
        reason: Option<&str>,
    ) -> PosResult<Service> {
        let status: ServiceStatus = status.parse()?;

        let mut uow = self.db.begin_unit("update_service_status").await?;
        let result = set_service_status_in(uow.conn(), actor, service_id, status, reason).await;
        let service = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            invoice_number = %service.invoice_number,
            status = %service.status,
            "Service status updated"
        );
        Ok(service)
    }
}

async fn create_in(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    cart: &ClassifiedCart,
    checkout: &Checkout,
    allow_fallback: bool,
) -> PosResult<SaleDetail> {
    let now = Utc::now();
    let shop_id = actor.shop_id.as_str();

    let invoice_number = sequence::next_number(conn, shop_id, now, allow_fallback).await?;
    let customer = customer::resolve(conn, shop_id, &cart.customer).await;

    // One decrement per product, so repeated lines can't each pass the
    // stock check on their own.
    let mut products: BTreeMap<String, Product> = BTreeMap::new();
    for (product_id, quantity) in cart.requested_by_product() {
        let product = inventory::decrement(conn, shop_id, product_id, quantity).await?;
        products.insert(product_id.to_string(), product);
    }

    let jobs = billable_jobs(conn, shop_id, &cart.services).await?;

    let sale_id = Uuid::new_v4().to_string();
    let items = cart
        .goods
        .iter()
        .enumerate()
        .map(|(position, line)| sale_item(&sale_id, position, line, &products))
        .collect::<PosResult<Vec<_>>>()?;

    let totals = cart.totals();
    if totals.subtotal_mismatch() {
        warn!(
            shop_id = %shop_id,
            invoice_number = %invoice_number,
            supplied = %totals.subtotal,
            computed = %totals.computed_subtotal,
            "Caller subtotal differs from item subtotal"
        );
    }

    let sale = Sale {
        id: sale_id.clone(),
        shop_id: shop_id.to_string(),
        invoice_number: invoice_number.clone(),
        customer_id: customer.as_ref().map(|c| c.id.clone()),
        customer_name: snapshot(cart.customer.name.as_deref(), customer.as_ref().map(|c| c.name.as_str())),
        customer_phone: snapshot(
            cart.customer.phone.as_deref(),
            customer.as_ref().and_then(|c| c.phone.as_deref()),
        ),
        items,
        subtotal_cents: totals.subtotal.cents(),
        discount_cents: totals.discount.cents(),
        tax_cents: totals.tax.cents(),
        total_cents: totals.total.cents(),
        payment_method: cart.payment_method,
        payment_details: checkout.payment_details.clone(),
        status: SaleStatus::Completed,
        returned_amount_cents: 0,
        actor_id: actor.user_id.clone(),
        notes: checkout.notes.clone(),
        created_at: now,
        updated_at: now,
        return_history: Vec::new(),
        status_history: Vec::new(),
    };
    sale_rows::insert_sale(conn, &sale).await?;

    let mut services = Vec::with_capacity(cart.services.len());
    for line in &cart.services {
        let service = Service {
            invoice_number: numbering::service_invoice_number(&invoice_number),
            sale_id: Some(sale_id.clone()),
            customer_name: sale.customer_name.clone(),
            customer_phone: sale.customer_phone.clone(),
            ..service_record(line, actor, cart.payment_method, now)
        };
        service_rows::insert_service(conn, &service).await?;
        services.push(service);
    }

    for (job_id, job_number) in &jobs {
        let billable = [JobStatus::Pending, JobStatus::InProgress, JobStatus::Completed];
        if !repair_job::claim_for_sale(conn, shop_id, job_id, &sale_id, &billable, now).await? {
            return Err(CoreError::JobAlreadyBilled {
                job_number: job_number.clone(),
            }
            .into());
        }
        info!(
            shop_id = %shop_id,
            job_number = %job_number,
            invoice_number = %invoice_number,
            "Quick service billed"
        );
    }

    Ok(SaleDetail {
        sale,
        services,
        customer,
    })
}

async fn record_in(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    input: &NewService,
    payment_method: PaymentMethod,
    allow_fallback: bool,
) -> PosResult<Service> {
    let now = Utc::now();
    let number = sequence::next_number(conn, &actor.shop_id, now, allow_fallback).await?;

    let service = Service {
        invoice_number: numbering::service_invoice_number(&number),
        sale_id: None,
        customer_name: input.customer_name.clone(),
        customer_phone: input.customer_phone.clone(),
        notes: input.notes.clone(),
        ..service_record(&input.line, actor, payment_method, now)
    };
    service_rows::insert_service(conn, &service).await?;
    Ok(service)
}

async fn set_service_status_in(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    service_id: &str,
    status: ServiceStatus,
    reason: Option<&str>,
) -> PosResult<Service> {
    let mut service = service_rows::fetch_service(conn, &actor.shop_id, service_id)
        .await?
        .ok_or_else(|| CoreError::ServiceNotFound(service_id.to_string()))?;

    if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
        let entry = format!("Status change: {reason}");
        service.notes = Some(match service.notes.take() {
            Some(notes) if !notes.is_empty() => format!("{notes}\n{entry}"),
            _ => entry,
        });
    }
    service.status = status;
    service.updated_at = Utc::now();

    service_rows::update_status(
        conn,
        &service.id,
        service.status,
        service.notes.as_deref(),
        service.updated_at,
    )
    .await?;
    Ok(service)
}

/// Loads and checks every repair job the service lines bill.
///
/// Returns `job id → job number`, one entry per job.
async fn billable_jobs(
    conn: &mut SqliteConnection,
    shop_id: &str,
    lines: &[ServiceLine],
) -> PosResult<BTreeMap<String, String>> {
    let ids: BTreeSet<&str> = lines
        .iter()
        .filter_map(|line| line.repair_job_id.as_deref())
        .collect();

    let mut jobs = BTreeMap::new();
    for id in ids {
        let job = repair_job::fetch_job(conn, shop_id, id)
            .await?
            .ok_or_else(|| CoreError::JobNotFound(id.to_string()))?;
        job.ensure_billable_at_checkout()?;
        jobs.insert(job.id, job.job_number);
    }
    Ok(jobs)
}

fn sale_item(
    sale_id: &str,
    position: usize,
    line: &GoodsLine,
    products: &BTreeMap<String, Product>,
) -> PosResult<SaleItem> {
    let (line, name, quantity, unit_price_cents, discount_cents) = match line {
        GoodsLine::Product(p) => {
            let product = products.get(&p.product_id).ok_or_else(|| {
                PosError::from(CoreError::ProductNotFoundInShop {
                    product_id: p.product_id.clone(),
                })
            })?;
            (
                SaleLine::Product {
                    product_id: product.id.clone(),
                    cost_price_cents: product.snapshot_cost(p.client_cost_cents),
                },
                product.name.clone(),
                p.quantity,
                p.price_cents,
                p.discount_cents,
            )
        }
        GoodsLine::Manual(m) => (
            SaleLine::Manual,
            m.name.clone(),
            m.quantity,
            m.price_cents,
            m.discount_cents,
        ),
    };

    Ok(SaleItem {
        id: Uuid::new_v4().to_string(),
        sale_id: sale_id.to_string(),
        position: position as i64,
        line,
        name,
        quantity,
        unit_price_cents,
        discount_cents,
        returned_quantity: 0,
    })
}

/// Service row for a line; invoice number, sale link and customer are
/// filled in by the caller.
fn service_record(
    line: &ServiceLine,
    actor: &ActorContext,
    payment_method: PaymentMethod,
    now: DateTime<Utc>,
) -> Service {
    Service {
        id: Uuid::new_v4().to_string(),
        shop_id: actor.shop_id.clone(),
        sale_id: None,
        repair_job_id: line.repair_job_id.clone(),
        invoice_number: String::new(),
        name: line.name.trim().to_string(),
        description: line.description.clone(),
        price_cents: line.price_cents,
        cost_price_cents: line.cost_price_cents,
        quantity: line.quantity,
        discount_cents: line.discount_cents,
        total_cents: line.total().cents(),
        payment_method,
        customer_name: None,
        customer_phone: None,
        actor_id: actor.user_id.clone(),
        status: ServiceStatus::Completed,
        notes: None,
        created_at: now,
        updated_at: now,
    }
}

/// Checkout value first, resolved customer second.
fn snapshot(supplied: Option<&str>, resolved: Option<&str>) -> Option<String> {
    supplied.or(resolved).map(str::to_string)
}

async fn cancel_in(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    sale_id: &str,
    reason: Option<&str>,
) -> PosResult<Sale> {
    let sale = sale_rows::fetch_sale(conn, &actor.shop_id, sale_id)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

    let refuse = || CoreError::InvalidSaleStatus {
        invoice_number: sale.invoice_number.clone(),
        status: sale.status.to_string(),
        operation: "cancel".to_string(),
    };
    if sale.status != SaleStatus::Completed || sale.has_returns() {
        return Err(refuse().into());
    }

    let now = Utc::now();
    let updated = sale_rows::update_status(
        conn,
        &sale.id,
        SaleStatus::Completed,
        SaleStatus::Cancelled,
        sale.returned_amount_cents,
        now,
    )
    .await?;
    if !updated {
        return Err(refuse().into());
    }

    sale_rows::insert_status_change(
        conn,
        &StatusChange {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            status: SaleStatus::Cancelled,
            reason: reason.map(str::to_string),
            actor_id: actor.user_id.clone(),
            changed_at: now,
        },
    )
    .await?;

    sale_rows::fetch_sale(conn, &actor.shop_id, sale_id)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::repository::product::NewProduct;
    use velo_core::cart::CartLine;
    use velo_core::Shop;

    async fn setup() -> (Database, Shop, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shop = db.shops().create("Velo Works").await.unwrap();
        let product = db
            .products()
            .create(
                &shop.id,
                NewProduct {
                    name: "Brake Pad".into(),
                    price_cents: 1000,
                    cost_cents: 400,
                    quantity: 5,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (db, shop, product)
    }

    #[tokio::test]
    async fn test_mixed_cart() {
        let (db, shop, pad) = setup().await;
        let actor = ActorContext::new(&shop.id, "cashier-1");

        let checkout = Checkout::new("cash")
            .line(CartLine::product(&pad.id, 2, 1000).with_cost_price(999))
            .line(CartLine::manual("Valve cap", 1, 150))
            .line(CartLine::service("Brake tune", 1, 2500))
            .customer("Ana", "555 0100");

        let detail = db.sales().create_sale(&actor, &checkout).await.unwrap();
        let sale = &detail.sale;

        assert_eq!(sale.subtotal_cents, 2150);
        assert_eq!(sale.total_cents, 2150);
        assert_eq!(sale.items.len(), 2);
        assert_eq!(sale.items[0].cost_price().cents(), 400);
        assert_eq!(sale.items[1].line, SaleLine::Manual);
        assert_eq!(sale.actor_id.as_deref(), Some("cashier-1"));
        assert_eq!(detail.services.len(), 1);
        assert_eq!(
            detail.services[0].invoice_number,
            format!("{}-SRV", sale.invoice_number)
        );
        assert_eq!(detail.services[0].sale_id.as_deref(), Some(sale.id.as_str()));
        assert_eq!(detail.customer.as_ref().map(|c| c.name.as_str()), Some("Ana"));

        let stored = db.sales().get_sale(&actor, &sale.id).await.unwrap();
        assert_eq!(stored.sale.items, sale.items);
        assert_eq!(stored.services.len(), 1);
        assert!(stored.customer.is_some());

        let pad = db.products().get_by_id(&shop.id, &pad.id).await.unwrap().unwrap();
        assert_eq!(pad.quantity, 3);
    }

    #[tokio::test]
    async fn test_repeated_lines_share_stock() {
        let (db, shop, pad) = setup().await;
        let actor = ActorContext::system(&shop.id);

        let checkout = Checkout::new("cash")
            .line(CartLine::product(&pad.id, 3, 1000))
            .line(CartLine::product(&pad.id, 3, 1000));

        let err = db.sales().create_sale(&actor, &checkout).await.unwrap_err();
        assert_eq!(
            err.domain(),
            Some(&CoreError::InsufficientStock {
                product: "Brake Pad".into(),
                available: 5,
                requested: 6,
            })
        );
    }

    #[tokio::test]
    async fn test_cancel_sale() {
        let (db, shop, pad) = setup().await;
        let actor = ActorContext::new(&shop.id, "manager");
        let checkout = Checkout::new("credit_card").line(CartLine::product(&pad.id, 1, 1000));
        let sale = db.sales().create_sale(&actor, &checkout).await.unwrap().sale;

        let cancelled = db
            .sales()
            .cancel_sale(&actor, &sale.id, Some("customer changed mind"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(cancelled.status_history.len(), 1);
        assert_eq!(cancelled.status_history[0].status, SaleStatus::Cancelled);

        let again = db.sales().cancel_sale(&actor, &sale.id, None).await.unwrap_err();
        assert!(matches!(
            again.domain(),
            Some(CoreError::InvalidSaleStatus { .. })
        ));

        // Stock stays where the sale left it.
        let pad = db.products().get_by_id(&shop.id, &pad.id).await.unwrap().unwrap();
        assert_eq!(pad.quantity, 4);
    }

    #[tokio::test]
    async fn test_standalone_service_lifecycle() {
        let (db, shop, _) = setup().await;
        let actor = ActorContext::new(&shop.id, "mechanic");

        let service = db
            .sales()
            .record_service(
                &actor,
                &NewService {
                    line: ServiceLine {
                        name: "Wheel true".into(),
                        quantity: 1,
                        price_cents: 2000,
                        ..Default::default()
                    },
                    payment_method: "cash".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(service.sale_id.is_none());
        assert!(service.invoice_number.ends_with("-0001-SRV"));
        assert_eq!(service.total_cents, 2000);

        let refunded = db
            .sales()
            .update_service_status(&actor, &service.id, "refunded", Some("wobble came back"))
            .await
            .unwrap();
        assert_eq!(refunded.status, ServiceStatus::Refunded);
        assert_eq!(refunded.notes.as_deref(), Some("Status change: wobble came back"));

        let err = db
            .sales()
            .update_service_status(&actor, &service.id, "archived", None)
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::Validation(_))));
    }
}
