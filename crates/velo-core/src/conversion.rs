//! # Repair-to-Sale Billing Plan
//!
//! Turns a completed repair job into the lines of its sale.
//!
//! ```text
//!   job.parts[]    ──► sale goods (product or manual; stock already taken)
//!   job.services[] ──┐
//!   job.labor[]    ──┴► receipt lines ("Labor: {description}"), not persisted
//!
//!   sale.subtotal  = Σ part totals
//!   services_subtotal = Σ service prices + Σ labor totals   (receipt only)
//!   sale.total     = job.total_cost
//! ```

use serde::{Deserialize, Serialize};

use crate::cart::{GoodsLine, ManualLine, ProductLine};
use crate::error::CoreResult;
use crate::money::Money;
use crate::repair::RepairJob;

/// A receipt-only line for a job service or labor entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub name: String,
    pub price_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingPlan {
    pub goods: Vec<GoodsLine>,
    pub receipt_lines: Vec<ReceiptLine>,
    pub subtotal: Money,
    pub services_subtotal: Money,
    pub total: Money,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub notes: String,
}

/// Builds the sale for a job. Fails unless the job is completed and unbilled.
pub fn plan_billing(job: &RepairJob) -> CoreResult<BillingPlan> {
    job.ensure_convertible()?;

    let goods = job
        .parts
        .iter()
        .map(|part| match &part.product_id {
            Some(product_id) => GoodsLine::Product(ProductLine {
                product_id: product_id.clone(),
                quantity: part.quantity,
                price_cents: part.unit_price_cents,
                discount_cents: 0,
                client_cost_cents: None,
            }),
            None => GoodsLine::Manual(ManualLine {
                name: part.name.clone(),
                quantity: part.quantity,
                price_cents: part.unit_price_cents,
                discount_cents: 0,
            }),
        })
        .collect();

    let receipt_lines = job
        .services
        .iter()
        .map(|service| ReceiptLine {
            name: service.name.clone(),
            price_cents: service.price_cents,
            quantity: 1,
        })
        .chain(job.labor.iter().map(|labor| ReceiptLine {
            name: format!("Labor: {}", labor.description),
            price_cents: labor.total_cost_cents,
            quantity: 1,
        }))
        .collect();

    Ok(BillingPlan {
        goods,
        receipt_lines,
        subtotal: job.parts_total(),
        services_subtotal: job.services_total() + job.labor_total(),
        total: job.total_cost(),
        customer_name: job.customer.name.clone(),
        customer_phone: job.customer.phone.clone(),
        notes: format!("Converted from repair job {}", job.job_number),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::repair::{JobCustomer, JobStatus, NewJobService, NewLabor, NewPart, NewRepairJob};
    use chrono::Utc;

    fn completed_job() -> RepairJob {
        let now = Utc::now();
        let mut job = RepairJob::open(
            NewRepairJob {
                customer: JobCustomer {
                    name: "Ben".into(),
                    phone: Some("555-0199".into()),
                    email: None,
                },
                description: "Full service".into(),
                deposit_cents: 2000,
                ..Default::default()
            },
            "shop-1",
            "VEL01-20261014-0003",
            None,
            now,
        )
        .unwrap();

        job.add_part(
            &NewPart {
                product_id: Some("prod-chain".into()),
                name: Some("Chain".into()),
                quantity: 1,
                unit_price_cents: 3000,
            },
            now,
        )
        .unwrap();
        job.add_part(
            &NewPart {
                product_id: None,
                name: Some("Used saddle".into()),
                quantity: 1,
                unit_price_cents: 2000,
            },
            now,
        )
        .unwrap();
        job.add_labor(
            &NewLabor {
                description: "Overhaul".into(),
                hours_hundredths: 100,
                hourly_rate_cents: 2000,
            },
            now,
        )
        .unwrap();
        job.add_service(
            &NewJobService {
                name: "Wash".into(),
                price_cents: 1000,
                catalog_ref: None,
            },
            now,
        )
        .unwrap();
        job.transition_to(JobStatus::InProgress, now).unwrap();
        job.transition_to(JobStatus::Completed, now).unwrap();
        job
    }

    #[test]
    fn test_plan_splits_parts_from_receipt_lines() {
        let job = completed_job();
        let plan = plan_billing(&job).unwrap();

        assert_eq!(plan.goods.len(), 2);
        assert!(matches!(plan.goods[0], GoodsLine::Product(_)));
        assert!(matches!(plan.goods[1], GoodsLine::Manual(_)));

        let names: Vec<&str> = plan.receipt_lines.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Wash", "Labor: Overhaul"]);

        assert_eq!(plan.subtotal.cents(), 5000);
        assert_eq!(plan.services_subtotal.cents(), 3000);
        assert_eq!(plan.total.cents(), 8000);
        assert_eq!(plan.notes, "Converted from repair job VEL01-20261014-0003");
    }

    #[test]
    fn test_plan_requires_completed_job() {
        let mut job = completed_job();
        job.status = JobStatus::InProgress;
        assert!(matches!(
            plan_billing(&job),
            Err(CoreError::JobNotCompleted { .. })
        ));

        let mut billed = completed_job();
        billed.mark_billed("sale-9", Utc::now());
        assert!(matches!(
            plan_billing(&billed),
            Err(CoreError::JobAlreadyBilled { .. })
        ));
    }
}
