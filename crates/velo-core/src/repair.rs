//! # Repair Jobs
//!
//! The repair job aggregate: its status machine, its charge lists and the
//! cost recomputation that runs after every mutation.
//!
//! ## Status Machine
//! ```text
//!   pending ──────► in_progress ──────► completed ──────► billed
//!      │                 │                              (conversion
//!      │                 │                               only)
//!      └────► cancelled ◄┘
//!
//!   billed and cancelled are terminal.
//! ```
//!
//! ## Cost Invariant
//! ```text
//!   total_cost        = Σ parts.total_price + Σ labor.total_cost + Σ services.price
//!   remaining_balance = total_cost − deposit
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    validate_amount_cents, validate_hours_hundredths, validate_name, validate_quantity,
};

// =============================================================================
// Enums
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Billed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::Completed,
        JobStatus::Billed,
        JobStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Billed => "billed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Billed | JobStatus::Cancelled)
    }

    /// Edges of the status machine, billing included.
    pub const fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::InProgress)
                | (JobStatus::Pending, JobStatus::Cancelled)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Cancelled)
                | (JobStatus::Completed, JobStatus::Billed)
        )
    }

    /// Statuses a quick service can be billed from at checkout.
    pub const fn billable_at_checkout(&self) -> bool {
        matches!(
            self,
            JobStatus::Pending | JobStatus::InProgress | JobStatus::Completed
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| {
                ValidationError::NotAllowed {
                    field: "status".to_string(),
                    allowed: JobStatus::ALL.iter().map(|st| st.as_str().to_string()).collect(),
                }
                .into()
            })
    }
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[default]
    RepairJob,
    /// Same-visit work, usually billed straight from the register.
    QuickService,
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

// =============================================================================
// Labor Hours
// =============================================================================

/// Hours in fixed-point hundredths (`150` = 1.5 h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LaborHours(i64);

impl LaborHours {
    pub const fn from_hundredths(hundredths: i64) -> Self {
        LaborHours(hundredths)
    }

    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    /// `rate × hours`, rounded half up to the cent.
    pub fn cost_at(&self, hourly_rate: Money) -> Money {
        hourly_rate.multiply_hundredths(self.0)
    }
}

impl fmt::Display for LaborHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}h", self.0 / 100, (self.0 % 100).abs())
    }
}

// =============================================================================
// Embedded Snapshots
// =============================================================================

/// Customer as recorded on the job. Not a reference to a customer row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// The bike (or other equipment) being worked on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentItem {
    pub item_type: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub color: Option<String>,
    pub serial_number: Option<String>,
}

// =============================================================================
// Charge Entries
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    /// Stocked product the part was taken from.
    pub product_id: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborEntry {
    pub id: String,
    pub description: String,
    pub hours: LaborHours,
    pub hourly_rate_cents: i64,
    pub total_cost_cents: i64,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobService {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    /// Entry in the shop's repair-service catalog, if any.
    pub catalog_ref: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobNote {
    pub id: String,
    pub text: String,
    pub actor_id: Option<String>,
    pub added_at: DateTime<Utc>,
}

// =============================================================================
// Inputs
// =============================================================================

/// Input for opening a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRepairJob {
    pub customer: JobCustomer,
    #[serde(default)]
    pub item: EquipmentItem,
    pub description: String,
    #[serde(default)]
    pub job_type: JobType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub estimated_cost_cents: i64,
    pub estimated_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub deposit_cents: i64,
    pub assigned_to: Option<String>,
}

impl NewRepairJob {
    pub fn validate(&self) -> CoreResult<()> {
        validate_name("customer name", &self.customer.name)?;
        if self.description.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "description".to_string(),
            }
            .into());
        }
        validate_amount_cents("estimated cost", self.estimated_cost_cents)?;
        validate_amount_cents("deposit", self.deposit_cents)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPart {
    pub product_id: Option<String>,
    /// May be omitted for stocked parts; the product name is used.
    pub name: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLabor {
    pub description: String,
    pub hours_hundredths: i64,
    pub hourly_rate_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJobService {
    pub name: String,
    pub price_cents: i64,
    pub catalog_ref: Option<String>,
}

// =============================================================================
// Repair Job
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairJob {
    pub id: String,
    pub shop_id: String,
    /// Shares the shop's invoice number space.
    pub job_number: String,
    pub job_type: JobType,
    pub customer: JobCustomer,
    pub item: EquipmentItem,
    pub description: String,
    pub status: JobStatus,
    pub priority: Priority,
    pub estimated_cost_cents: i64,
    pub estimated_completion_date: Option<NaiveDate>,
    pub actual_completion_date: Option<DateTime<Utc>>,
    pub parts: Vec<Part>,
    pub labor: Vec<LaborEntry>,
    pub services: Vec<JobService>,
    pub notes: Vec<JobNote>,
    pub total_cost_cents: i64,
    pub deposit_cents: i64,
    pub remaining_balance_cents: i64,
    /// Set once, by billing. Implies `status == Billed`.
    pub sale_id: Option<String>,
    pub assigned_to: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepairJob {
    /// Opens a pending job with empty charge lists.
    pub fn open(
        input: NewRepairJob,
        shop_id: impl Into<String>,
        job_number: impl Into<String>,
        created_by: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        input.validate()?;

        let mut job = RepairJob {
            id: Uuid::new_v4().to_string(),
            shop_id: shop_id.into(),
            job_number: job_number.into(),
            job_type: input.job_type,
            customer: input.customer,
            item: input.item,
            description: input.description,
            status: JobStatus::Pending,
            priority: input.priority,
            estimated_cost_cents: input.estimated_cost_cents,
            estimated_completion_date: input.estimated_completion_date,
            actual_completion_date: None,
            parts: Vec::new(),
            labor: Vec::new(),
            services: Vec::new(),
            notes: Vec::new(),
            total_cost_cents: 0,
            deposit_cents: input.deposit_cents,
            remaining_balance_cents: 0,
            sale_id: None,
            assigned_to: input.assigned_to,
            created_by,
            created_at: now,
            updated_at: now,
        };
        job.recompute_totals();
        Ok(job)
    }

    #[inline]
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }

    #[inline]
    pub fn deposit(&self) -> Money {
        Money::from_cents(self.deposit_cents)
    }

    pub fn parts_total(&self) -> Money {
        self.parts
            .iter()
            .map(|p| Money::from_cents(p.total_price_cents))
            .sum()
    }

    pub fn labor_total(&self) -> Money {
        self.labor
            .iter()
            .map(|l| Money::from_cents(l.total_cost_cents))
            .sum()
    }

    pub fn services_total(&self) -> Money {
        self.services
            .iter()
            .map(|s| Money::from_cents(s.price_cents))
            .sum()
    }

    /// Re-derives `total_cost` and `remaining_balance` from the charge lists.
    pub fn recompute_totals(&mut self) {
        let total = self.parts_total() + self.labor_total() + self.services_total();
        self.total_cost_cents = total.cents();
        self.remaining_balance_cents = (total - self.deposit()).cents();
    }

    /// Rejects cost mutations on billed or cancelled jobs.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::JobClosed {
                job_number: self.job_number.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Appends a part. `input.name` must already be resolved.
    pub fn add_part(&mut self, input: &NewPart, now: DateTime<Utc>) -> CoreResult<&Part> {
        self.ensure_open()?;
        let name = input.name.as_deref().unwrap_or_default();
        validate_name("part name", name)?;
        validate_quantity(input.quantity)?;
        validate_amount_cents("unit price", input.unit_price_cents)?;

        let total = Money::from_cents(input.unit_price_cents).multiply_quantity(input.quantity);
        self.parts.push(Part {
            id: Uuid::new_v4().to_string(),
            product_id: input.product_id.clone(),
            name: name.trim().to_string(),
            quantity: input.quantity,
            unit_price_cents: input.unit_price_cents,
            total_price_cents: total.cents(),
            added_at: now,
        });
        self.touch(now);
        Ok(&self.parts[self.parts.len() - 1])
    }

    pub fn add_labor(&mut self, input: &NewLabor, now: DateTime<Utc>) -> CoreResult<&LaborEntry> {
        self.ensure_open()?;
        validate_name("labor description", &input.description)?;
        validate_hours_hundredths(input.hours_hundredths)?;
        validate_amount_cents("hourly rate", input.hourly_rate_cents)?;

        let hours = LaborHours::from_hundredths(input.hours_hundredths);
        let total = hours.cost_at(Money::from_cents(input.hourly_rate_cents));
        self.labor.push(LaborEntry {
            id: Uuid::new_v4().to_string(),
            description: input.description.trim().to_string(),
            hours,
            hourly_rate_cents: input.hourly_rate_cents,
            total_cost_cents: total.cents(),
            added_at: now,
        });
        self.touch(now);
        Ok(&self.labor[self.labor.len() - 1])
    }

    pub fn add_service(
        &mut self,
        input: &NewJobService,
        now: DateTime<Utc>,
    ) -> CoreResult<&JobService> {
        self.ensure_open()?;
        validate_name("service name", &input.name)?;
        validate_amount_cents("price", input.price_cents)?;

        self.services.push(JobService {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            price_cents: input.price_cents,
            catalog_ref: input.catalog_ref.clone(),
            added_at: now,
        });
        self.touch(now);
        Ok(&self.services[self.services.len() - 1])
    }

    /// Notes are audit entries and allowed in any status.
    pub fn add_note(
        &mut self,
        text: &str,
        actor_id: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<&JobNote> {
        if text.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "note".to_string(),
            }
            .into());
        }
        self.notes.push(JobNote {
            id: Uuid::new_v4().to_string(),
            text: text.trim().to_string(),
            actor_id,
            added_at: now,
        });
        self.updated_at = now;
        Ok(&self.notes[self.notes.len() - 1])
    }

    /// Manual status change. `billed` is only reachable through billing.
    pub fn transition_to(&mut self, next: JobStatus, now: DateTime<Utc>) -> CoreResult<()> {
        if next == JobStatus::Billed || !self.status.can_transition_to(next) {
            return Err(self.invalid_transition(next));
        }

        self.status = next;
        if next == JobStatus::Completed {
            self.actual_completion_date = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Checks the job can be converted into a sale.
    pub fn ensure_convertible(&self) -> CoreResult<()> {
        if self.sale_id.is_some() || self.status == JobStatus::Billed {
            return Err(CoreError::JobAlreadyBilled {
                job_number: self.job_number.clone(),
            });
        }
        if self.status != JobStatus::Completed {
            return Err(CoreError::JobNotCompleted {
                job_number: self.job_number.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Checks a checkout service line may bill this job.
    pub fn ensure_billable_at_checkout(&self) -> CoreResult<()> {
        if self.sale_id.is_some() || self.status == JobStatus::Billed {
            return Err(CoreError::JobAlreadyBilled {
                job_number: self.job_number.clone(),
            });
        }
        if !self.status.billable_at_checkout() {
            return Err(self.invalid_transition(JobStatus::Billed));
        }
        Ok(())
    }

    pub fn ensure_deletable(&self) -> CoreResult<()> {
        if self.status == JobStatus::Billed {
            return Err(CoreError::CannotDeleteBilledJob {
                job_number: self.job_number.clone(),
            });
        }
        Ok(())
    }

    /// Records the billing sale in the in-memory copy.
    pub fn mark_billed(&mut self, sale_id: impl Into<String>, now: DateTime<Utc>) {
        self.status = JobStatus::Billed;
        self.sale_id = Some(sale_id.into());
        self.updated_at = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.recompute_totals();
        self.updated_at = now;
    }

    fn invalid_transition(&self, next: JobStatus) -> CoreError {
        CoreError::InvalidTransition {
            job_number: self.job_number.clone(),
            from: self.status.to_string(),
            to: next.to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn job() -> RepairJob {
        RepairJob::open(
            NewRepairJob {
                customer: JobCustomer {
                    name: "Ana".into(),
                    phone: Some("555-0101".into()),
                    email: None,
                },
                description: "Rear derailleur skipping".into(),
                deposit_cents: 2000,
                ..Default::default()
            },
            "shop-1",
            "VEL01-20261014-0001",
            Some("tech-1".into()),
            Utc::now(),
        )
        .unwrap()
    }

    fn part(name: &str, quantity: i64, unit_price_cents: i64) -> NewPart {
        NewPart {
            product_id: None,
            name: Some(name.into()),
            quantity,
            unit_price_cents,
        }
    }

    #[test]
    fn test_open_starts_pending_with_zero_cost() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total_cost_cents, 0);
        assert_eq!(job.remaining_balance_cents, -2000);
        assert_eq!(job.priority, Priority::Medium);
    }

    #[test]
    fn test_costs_parts_labor_deposit() {
        // Parts total 50, labor total 30, deposit 20.
        let mut job = job();
        let now = Utc::now();
        job.add_part(&part("Chain", 1, 3000), now).unwrap();
        job.add_part(&part("Cable", 2, 1000), now).unwrap();
        job.add_labor(
            &NewLabor {
                description: "Drivetrain service".into(),
                hours_hundredths: 200,
                hourly_rate_cents: 1500,
            },
            now,
        )
        .unwrap();

        assert_eq!(job.total_cost_cents, 8000);
        assert_eq!(job.remaining_balance_cents, 6000);
    }

    #[test]
    fn test_services_count_towards_total() {
        let mut job = job();
        job.add_service(
            &NewJobService {
                name: "Wheel true".into(),
                price_cents: 2500,
                catalog_ref: None,
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(job.total_cost_cents, 2500);
    }

    #[test]
    fn test_status_machine() {
        let mut job = job();
        let now = Utc::now();

        assert!(job.transition_to(JobStatus::Billed, now).is_err());
        assert!(job.transition_to(JobStatus::Completed, now).is_err());
        assert!(job.transition_to(JobStatus::Pending, now).is_err());

        job.transition_to(JobStatus::InProgress, now).unwrap();
        job.transition_to(JobStatus::Completed, now).unwrap();
        assert!(job.actual_completion_date.is_some());

        // Still only via conversion.
        assert!(matches!(
            job.transition_to(JobStatus::Billed, now),
            Err(CoreError::InvalidTransition { .. })
        ));
        assert!(job.transition_to(JobStatus::Cancelled, now).is_err());
    }

    #[test]
    fn test_cancelled_and_billed_are_terminal() {
        let now = Utc::now();
        let mut cancelled = job();
        cancelled.transition_to(JobStatus::Cancelled, now).unwrap();
        for next in JobStatus::ALL {
            assert!(cancelled.clone().transition_to(next, now).is_err());
        }

        let mut billed = job();
        billed.status = JobStatus::Completed;
        billed.mark_billed("sale-1", now);
        for next in JobStatus::ALL {
            assert!(billed.clone().transition_to(next, now).is_err());
        }
    }

    #[test]
    fn test_closed_job_rejects_charges_but_takes_notes() {
        let now = Utc::now();
        let mut job = job();
        job.transition_to(JobStatus::Cancelled, now).unwrap();

        assert!(matches!(
            job.add_part(&part("Tube", 1, 800), now),
            Err(CoreError::JobClosed { .. })
        ));
        assert!(job.add_note("Customer will pick up frame", None, now).is_ok());
        assert_eq!(job.notes.len(), 1);
    }

    #[test]
    fn test_convertible_guards() {
        let now = Utc::now();
        let mut job = job();
        assert!(matches!(
            job.ensure_convertible(),
            Err(CoreError::JobNotCompleted { .. })
        ));

        job.transition_to(JobStatus::InProgress, now).unwrap();
        job.transition_to(JobStatus::Completed, now).unwrap();
        assert!(job.ensure_convertible().is_ok());

        job.mark_billed("sale-1", now);
        assert!(matches!(
            job.ensure_convertible(),
            Err(CoreError::JobAlreadyBilled { .. })
        ));
        assert!(matches!(
            job.ensure_deletable(),
            Err(CoreError::CannotDeleteBilledJob { .. })
        ));
    }

    #[test]
    fn test_checkout_billing_guards() {
        let now = Utc::now();
        let mut job = job();
        assert!(job.ensure_billable_at_checkout().is_ok());

        job.transition_to(JobStatus::Cancelled, now).unwrap();
        assert!(matches!(
            job.ensure_billable_at_checkout(),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_labor_hours_display_and_rounding() {
        let hours = LaborHours::from_hundredths(150);
        assert_eq!(hours.to_string(), "1.50h");
        assert_eq!(hours.cost_at(Money::from_cents(1299)).cents(), 1949);
    }

    #[test]
    fn test_job_status_from_str() {
        assert_eq!("in_progress".parse::<JobStatus>(), Ok(JobStatus::InProgress));
        assert!("done".parse::<JobStatus>().is_err());
    }

    #[derive(Debug, Clone)]
    enum Charge {
        Part(i64, i64),
        Labor(i64, i64),
        Service(i64),
    }

    fn charge() -> impl Strategy<Value = Charge> {
        prop_oneof![
            (1i64..20, 0i64..10_000).prop_map(|(q, p)| Charge::Part(q, p)),
            (1i64..800, 0i64..10_000).prop_map(|(h, r)| Charge::Labor(h, r)),
            (0i64..50_000).prop_map(Charge::Service),
        ]
    }

    proptest! {
        #[test]
        fn prop_total_cost_matches_charge_lists(
            charges in proptest::collection::vec(charge(), 0..30),
            deposit in 0i64..100_000,
        ) {
            let now = Utc::now();
            let mut job = job();
            job.deposit_cents = deposit;

            for charge in charges {
                match charge {
                    Charge::Part(q, p) => {
                        job.add_part(&part("Part", q, p), now).unwrap();
                    }
                    Charge::Labor(h, r) => {
                        job.add_labor(&NewLabor {
                            description: "Labor".into(),
                            hours_hundredths: h,
                            hourly_rate_cents: r,
                        }, now).unwrap();
                    }
                    Charge::Service(p) => {
                        job.add_service(&NewJobService {
                            name: "Service".into(),
                            price_cents: p,
                            catalog_ref: None,
                        }, now).unwrap();
                    }
                }

                let expected: i64 = job.parts.iter().map(|p| p.total_price_cents).sum::<i64>()
                    + job.labor.iter().map(|l| l.total_cost_cents).sum::<i64>()
                    + job.services.iter().map(|s| s.price_cents).sum::<i64>();
                prop_assert_eq!(job.total_cost_cents, expected);
                prop_assert_eq!(job.remaining_balance_cents, expected - deposit);
            }
        }
    }
}
