//! Concurrent callers against one file-backed database with a real pool.

mod common;

use std::collections::HashSet;

use common::*;
use tempfile::TempDir;
use velo_core::cart::{CartLine, Checkout};
use velo_core::CoreError;
use velo_db::{Database, DbConfig};

async fn file_db() -> (TempDir, Database) {
    let dir = TempDir::new().expect("temp dir");
    let config = DbConfig::new(dir.path().join("velo.db")).max_connections(5);
    let db = Database::new(config).await.expect("file database");
    (dir, db)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_get_distinct_numbers() {
    let (_dir, db) = file_db().await;
    let (_, actor) = shop(&db, "Velo Works").await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let db = db.clone();
        let actor = actor.clone();
        handles.push(tokio::spawn(async move {
            let checkout = Checkout::new("cash").line(CartLine::manual(format!("Sticker {i}"), 1, 100));
            db.sales().create_sale(&actor, &checkout).await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let detail = handle.await.unwrap().unwrap();
        assert!(numbers.insert(detail.sale.invoice_number));
    }
    assert_eq!(numbers.len(), 16);
    assert!(numbers.iter().any(|n| n.ends_with("-0016")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stock_never_goes_negative() {
    let (_dir, db) = file_db().await;
    let (shop, actor) = shop(&db, "Velo Works").await;
    let light = product(&db, &shop.id, "Rear Light", 2500, 3).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let db = db.clone();
        let actor = actor.clone();
        let product_id = light.id.clone();
        handles.push(tokio::spawn(async move {
            let checkout = Checkout::new("cash").line(CartLine::product(&product_id, 1, 2500));
            db.sales().create_sale(&actor, &checkout).await
        }));
    }

    let mut sold = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(err) => assert!(matches!(
                err.domain(),
                Some(CoreError::InsufficientStock { available: 0, .. })
            )),
        }
    }

    assert_eq!(sold, 3);
    assert_eq!(stock(&db, &shop.id, &light.id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_job_is_converted_exactly_once() {
    let (_dir, db) = file_db().await;
    let (_, actor) = shop(&db, "Velo Works").await;
    let job = completed_job(&db, &actor).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let db = db.clone();
        let actor = actor.clone();
        let job_id = job.id.clone();
        handles.push(tokio::spawn(async move {
            db.conversions()
                .convert_repair_job_to_sale(&actor, &job_id, "debit_card", None)
                .await
        }));
    }

    let mut sale_ids = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(conversion) => sale_ids.push(conversion.sale.id),
            Err(err) => assert!(matches!(
                err.domain(),
                Some(CoreError::JobAlreadyBilled { .. })
            )),
        }
    }

    assert_eq!(sale_ids.len(), 1);
    let billed = db.repairs().get_job(&actor, &job.id).await.unwrap();
    assert_eq!(billed.sale_id.as_ref(), sale_ids.first());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_returns_never_exceed_the_sold_quantity() {
    let (_dir, db) = file_db().await;
    let (shop, actor) = shop(&db, "Velo Works").await;
    let pump = product(&db, &shop.id, "Mini Pump", 3000, 5).await;

    let checkout = Checkout::new("cash").line(CartLine::product(&pump.id, 2, 3000));
    let sale = db.sales().create_sale(&actor, &checkout).await.unwrap().sale;
    let item_id = sale.items[0].id.clone();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let db = db.clone();
        let actor = actor.clone();
        let sale_id = sale.id.clone();
        let item_id = item_id.clone();
        handles.push(tokio::spawn(async move {
            db.returns().return_item(&actor, &sale_id, &item_id, 1, None).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 2);
    assert_eq!(stock(&db, &shop.id, &pump.id).await, 5);
    let sale = db.sales().get_sale(&actor, &sale.id).await.unwrap().sale;
    assert_eq!(sale.items[0].returned_quantity, 2);
    assert_eq!(sale.returned_amount_cents, 6000);
}
