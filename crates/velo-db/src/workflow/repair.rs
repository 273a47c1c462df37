//! # Repair Job Lifecycle
//!
//! Opening jobs, adding charges, moving them through the status machine,
//! and deleting the ones that were never billed.
//!
//! ## Job Status
//! ```text
//!  pending ──► in_progress ──► completed ──► billed
//!     │             │                           ▲
//!     └──► cancelled ◄┘       conversion or quick-service checkout only
//! ```
//!
//! Every charge mutation reloads the job, appends one child row and
//! rewrites the header with recomputed totals, all in one unit of work.
//! Parts taken from stock decrement inventory in that same unit.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::error::{PosError, PosResult};
use crate::inventory;
use crate::pool::Database;
use crate::repository::repair_job as rows;
use crate::sequence;
use velo_core::repair::{NewJobService, NewLabor, NewPart, NewRepairJob};
use velo_core::validation::validate_quantity;
use velo_core::{ActorContext, CoreError, JobStatus, RepairJob};

#[derive(Debug, Clone)]
pub struct RepairManager {
    db: Database,
}

impl RepairManager {
    pub fn new(db: Database) -> Self {
        RepairManager { db }
    }

    /// Opens a pending job numbered from the shop's shared sequence.
    pub async fn create_job(
        &self,
        actor: &ActorContext,
        input: NewRepairJob,
    ) -> PosResult<RepairJob> {
        input.validate()?;

        let mut uow = self.db.begin_unit("create_repair_job").await?;
        let result = create_in(uow.conn(), actor, input, self.db.numbering_fallback()).await;
        let job = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            job_number = %job.job_number,
            job_type = ?job.job_type,
            "Repair job created"
        );
        Ok(job)
    }

    pub async fn get_job(&self, actor: &ActorContext, job_id: &str) -> PosResult<RepairJob> {
        let mut conn = self.db.pool().acquire().await?;
        let job = rows::fetch_job(&mut conn, &actor.shop_id, job_id)
            .await?
            .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;
        Ok(job)
    }

    /// Jobs of the caller's shop, newest first.
    pub async fn list_jobs(
        &self,
        actor: &ActorContext,
        status: Option<JobStatus>,
    ) -> PosResult<Vec<RepairJob>> {
        let mut conn = self.db.pool().acquire().await?;
        let jobs = rows::list_jobs(&mut conn, &actor.shop_id, status).await?;
        Ok(jobs)
    }

    /// Adds a part. A part with a product takes its units out of stock,
    /// and the whole add fails if there aren't enough.
    pub async fn add_part(
        &self,
        actor: &ActorContext,
        job_id: &str,
        input: NewPart,
    ) -> PosResult<RepairJob> {
        // Checked up front: the decrement below must never see a
        // non-positive quantity.
        validate_quantity(input.quantity)?;

        let mut uow = self.db.begin_unit("add_part").await?;
        let result = add_part_in(uow.conn(), actor, job_id, input).await;
        let job = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            job_number = %job.job_number,
            total_cost_cents = job.total_cost_cents,
            "Part added"
        );
        Ok(job)
    }

    pub async fn add_labor(
        &self,
        actor: &ActorContext,
        job_id: &str,
        input: NewLabor,
    ) -> PosResult<RepairJob> {
        let mut uow = self.db.begin_unit("add_labor").await?;
        let result = async {
            let conn = uow.conn();
            let now = Utc::now();
            let mut job = load(conn, actor, job_id).await?;
            let entry = job.add_labor(&input, now)?.clone();
            rows::insert_labor(conn, &job.id, &entry).await?;
            rows::update_header(conn, &job).await?;
            Ok::<_, PosError>(job)
        }
        .await;
        let job = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            job_number = %job.job_number,
            total_cost_cents = job.total_cost_cents,
            "Labor added"
        );
        Ok(job)
    }

    pub async fn add_service(
        &self,
        actor: &ActorContext,
        job_id: &str,
        input: NewJobService,
    ) -> PosResult<RepairJob> {
        let mut uow = self.db.begin_unit("add_job_service").await?;
        let result = async {
            let conn = uow.conn();
            let now = Utc::now();
            let mut job = load(conn, actor, job_id).await?;
            let service = job.add_service(&input, now)?.clone();
            rows::insert_service(conn, &job.id, &service).await?;
            rows::update_header(conn, &job).await?;
            Ok::<_, PosError>(job)
        }
        .await;
        let job = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            job_number = %job.job_number,
            total_cost_cents = job.total_cost_cents,
            "Service added to job"
        );
        Ok(job)
    }

    /// Appends an audit note. Allowed in any status, billed included.
    pub async fn add_note(
        &self,
        actor: &ActorContext,
        job_id: &str,
        text: &str,
    ) -> PosResult<RepairJob> {
        let mut uow = self.db.begin_unit("add_job_note").await?;
        let result = async {
            let conn = uow.conn();
            let now = Utc::now();
            let mut job = load(conn, actor, job_id).await?;
            let note = job.add_note(text, actor.user_id.clone(), now)?.clone();
            rows::insert_note(conn, &job.id, &note).await?;
            rows::update_header(conn, &job).await?;
            Ok::<_, PosError>(job)
        }
        .await;
        let job = uow.finish(result).await?;

        debug!(shop_id = %actor.shop_id, job_number = %job.job_number, "Note added");
        Ok(job)
    }

    /// Moves a job along the status machine. `billed` is refused here.
    pub async fn update_status(
        &self,
        actor: &ActorContext,
        job_id: &str,
        status: JobStatus,
    ) -> PosResult<RepairJob> {
        let mut uow = self.db.begin_unit("update_job_status").await?;
        let result = async {
            let conn = uow.conn();
            let mut job = load(conn, actor, job_id).await?;
            let from = job.status;
            job.transition_to(status, Utc::now())?;
            rows::update_header(conn, &job).await?;
            Ok::<_, PosError>((from, job))
        }
        .await;
        let (from, job) = uow.finish(result).await?;

        info!(
            shop_id = %actor.shop_id,
            job_number = %job.job_number,
            from = %from,
            to = %job.status,
            "Repair job status changed"
        );
        Ok(job)
    }

    /// Deletes a job that was never billed. Parts already taken from stock
    /// stay taken.
    pub async fn delete_job(&self, actor: &ActorContext, job_id: &str) -> PosResult<()> {
        let mut uow = self.db.begin_unit("delete_repair_job").await?;
        let result = async {
            let conn = uow.conn();
            let job = load(conn, actor, job_id).await?;
            job.ensure_deletable()?;
            if !rows::delete_job(conn, &actor.shop_id, &job.id).await? {
                return Err(PosError::from(CoreError::CannotDeleteBilledJob {
                    job_number: job.job_number,
                }));
            }
            Ok::<_, PosError>(job.job_number)
        }
        .await;
        let job_number = uow.finish(result).await?;

        info!(shop_id = %actor.shop_id, job_number = %job_number, "Repair job deleted");
        Ok(())
    }
}

async fn load(conn: &mut SqliteConnection, actor: &ActorContext, job_id: &str) -> PosResult<RepairJob> {
    let job = rows::fetch_job(conn, &actor.shop_id, job_id)
        .await?
        .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;
    Ok(job)
}

async fn create_in(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    input: NewRepairJob,
    allow_fallback: bool,
) -> PosResult<RepairJob> {
    let now: DateTime<Utc> = Utc::now();
    let job_number = sequence::next_number(conn, &actor.shop_id, now, allow_fallback).await?;
    let job = RepairJob::open(input, &actor.shop_id, job_number, actor.user_id.clone(), now)?;
    rows::insert_job(conn, &job).await?;
    Ok(job)
}

async fn add_part_in(
    conn: &mut SqliteConnection,
    actor: &ActorContext,
    job_id: &str,
    mut input: NewPart,
) -> PosResult<RepairJob> {
    let now = Utc::now();
    let mut job = load(conn, actor, job_id).await?;
    job.ensure_open()?;

    input.product_id = input
        .product_id
        .take()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    if let Some(product_id) = input.product_id.as_deref() {
        let product = inventory::decrement(conn, &actor.shop_id, product_id, input.quantity).await?;
        let unnamed = input.name.as_deref().map_or(true, |name| name.trim().is_empty());
        if unnamed {
            input.name = Some(product.name);
        }
    }

    let part = job.add_part(&input, now)?.clone();
    rows::insert_part(conn, &job.id, &part).await?;
    rows::update_header(conn, &job).await?;
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::repository::product::NewProduct;
    use velo_core::repair::JobCustomer;

    async fn setup() -> (Database, ActorContext, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shop = db.shops().create("Velo Works").await.unwrap();
        let chain = db
            .products()
            .create(
                &shop.id,
                NewProduct {
                    name: "Chain 11s".into(),
                    price_cents: 3500,
                    cost_cents: 1800,
                    quantity: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (db, ActorContext::new(&shop.id, "mechanic-1"), chain.id)
    }

    fn new_job() -> NewRepairJob {
        NewRepairJob {
            customer: JobCustomer {
                name: "Ben".into(),
                phone: Some("555 0101".into()),
                email: None,
            },
            description: "Drivetrain replacement".into(),
            deposit_cents: 2000,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_charges_recompute_totals() {
        let (db, actor, chain_id) = setup().await;
        let repairs = db.repairs();
        let job = repairs.create_job(&actor, new_job()).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total_cost_cents, 0);
        assert_eq!(job.remaining_balance_cents, -2000);
        assert_eq!(job.created_by.as_deref(), Some("mechanic-1"));

        repairs
            .add_part(
                &actor,
                &job.id,
                NewPart {
                    product_id: Some(chain_id.clone()),
                    quantity: 1,
                    unit_price_cents: 3500,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        repairs
            .add_labor(
                &actor,
                &job.id,
                NewLabor {
                    description: "Fit chain".into(),
                    hours_hundredths: 50,
                    hourly_rate_cents: 6000,
                },
            )
            .await
            .unwrap();
        let job = repairs
            .add_service(
                &actor,
                &job.id,
                NewJobService {
                    name: "Gear index".into(),
                    price_cents: 1500,
                    catalog_ref: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(job.parts[0].name, "Chain 11s");
        assert_eq!(job.total_cost_cents, 3500 + 3000 + 1500);
        assert_eq!(job.remaining_balance_cents, 8000 - 2000);

        let stored = repairs.get_job(&actor, &job.id).await.unwrap();
        assert_eq!(stored, job);

        let chain = db.products().get_by_id(&actor.shop_id, &chain_id).await.unwrap().unwrap();
        assert_eq!(chain.quantity, 1);
    }

    #[tokio::test]
    async fn test_part_without_stock_fails_whole_add() {
        let (db, actor, chain_id) = setup().await;
        let repairs = db.repairs();
        let job = repairs.create_job(&actor, new_job()).await.unwrap();

        let err = repairs
            .add_part(
                &actor,
                &job.id,
                NewPart {
                    product_id: Some(chain_id.clone()),
                    quantity: 3,
                    unit_price_cents: 3500,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::InsufficientStock { .. })));

        let job = repairs.get_job(&actor, &job.id).await.unwrap();
        assert!(job.parts.is_empty());
        assert_eq!(job.total_cost_cents, 0);
    }

    #[tokio::test]
    async fn test_status_machine_and_delete() {
        let (db, actor, _) = setup().await;
        let repairs = db.repairs();
        let job = repairs.create_job(&actor, new_job()).await.unwrap();

        let err = repairs
            .update_status(&actor, &job.id, JobStatus::Billed)
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::InvalidTransition { .. })));

        repairs
            .update_status(&actor, &job.id, JobStatus::InProgress)
            .await
            .unwrap();
        let done = repairs
            .update_status(&actor, &job.id, JobStatus::Completed)
            .await
            .unwrap();
        assert!(done.actual_completion_date.is_some());

        let listed = repairs
            .list_jobs(&actor, Some(JobStatus::Completed))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        repairs.delete_job(&actor, &job.id).await.unwrap();
        let err = repairs.get_job(&actor, &job.id).await.unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_notes_are_kept_in_order() {
        let (db, actor, _) = setup().await;
        let repairs = db.repairs();
        let job = repairs.create_job(&actor, new_job()).await.unwrap();

        repairs.add_note(&actor, &job.id, "Customer dropped off").await.unwrap();
        let job = repairs.add_note(&actor, &job.id, "Waiting on chain").await.unwrap();

        let stored = repairs.get_job(&actor, &job.id).await.unwrap();
        let texts: Vec<_> = stored.notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, ["Customer dropped off", "Waiting on chain"]);
        assert_eq!(stored.notes[0].actor_id.as_deref(), Some("mechanic-1"));

        assert!(repairs.add_note(&actor, &job.id, "   ").await.is_err());
    }
}
