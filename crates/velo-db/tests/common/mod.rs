//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use velo_core::repair::{JobCustomer, NewLabor, NewPart, NewRepairJob};
use velo_core::{ActorContext, JobStatus, Product, RepairJob, Shop};
use velo_db::{Database, DbConfig, NewProduct};

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

pub async fn shop(db: &Database, name: &str) -> (Shop, ActorContext) {
    let shop = db.shops().create(name).await.expect("shop");
    let actor = ActorContext::new(&shop.id, "cashier-1");
    (shop, actor)
}

pub async fn product(db: &Database, shop_id: &str, name: &str, price_cents: i64, stock: i64) -> Product {
    db.products()
        .create(
            shop_id,
            NewProduct {
                name: name.to_string(),
                price_cents,
                cost_cents: price_cents / 2,
                quantity: stock,
                ..Default::default()
            },
        )
        .await
        .expect("product")
}

pub async fn stock(db: &Database, shop_id: &str, product_id: &str) -> i64 {
    db.products()
        .get_by_id(shop_id, product_id)
        .await
        .expect("product lookup")
        .expect("product exists")
        .quantity
}

pub fn job_input(name: &str, deposit_cents: i64) -> NewRepairJob {
    NewRepairJob {
        customer: JobCustomer {
            name: name.to_string(),
            phone: Some("555 0110".to_string()),
            email: None,
        },
        description: "Service".to_string(),
        deposit_cents,
        ..Default::default()
    }
}

/// A completed job with $50.00 of manual parts, $30.00 of labor and a
/// $20.00 deposit.
pub async fn completed_job(db: &Database, actor: &ActorContext) -> RepairJob {
    let repairs = db.repairs();
    let job = repairs
        .create_job(actor, job_input("Ben", 2000))
        .await
        .expect("job");
    repairs
        .add_part(
            actor,
            &job.id,
            NewPart {
                name: Some("Cassette".into()),
                quantity: 1,
                unit_price_cents: 5000,
                ..Default::default()
            },
        )
        .await
        .expect("part");
    repairs
        .add_labor(
            actor,
            &job.id,
            NewLabor {
                description: "Drivetrain".into(),
                hours_hundredths: 50,
                hourly_rate_cents: 6000,
            },
        )
        .await
        .expect("labor");
    repairs
        .update_status(actor, &job.id, JobStatus::InProgress)
        .await
        .expect("start");
    repairs
        .update_status(actor, &job.id, JobStatus::Completed)
        .await
        .expect("complete")
}
