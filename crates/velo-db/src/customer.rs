//! # Customer Resolver
//!
//! Links a sale to a customer record, creating one when needed.
//!
//! ```text
//!   id given and in shop ──────────────► that customer
//!   phone given ── found in shop ──────► existing customer
//!        │
//!        └────── not found ── name? ───► new customer
//!   name only ─────────────────────────► new customer (walk-in)
//!   nothing ───────────────────────────► None
//! ```
//!
//! Resolution is best-effort: it runs inside a savepoint of the sale's
//! unit of work, and any failure rolls back only that savepoint.

use chrono::Utc;
use sqlx::{Connection, SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbResult;
use velo_core::cart::CustomerInput;
use velo_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, shop_id, name, phone, email, created_at";

/// Resolves the checkout's customer. Never fails the caller.
pub async fn resolve(
    conn: &mut SqliteConnection,
    shop_id: &str,
    input: &CustomerInput,
) -> Option<Customer> {
    if input.is_empty() {
        return None;
    }

    let mut savepoint = match conn.begin().await {
        Ok(savepoint) => savepoint,
        Err(e) => {
            warn!(shop_id = %shop_id, error = %e, "Customer resolution skipped: savepoint failed");
            return None;
        }
    };

    match resolve_in(&mut *savepoint, shop_id, input).await {
        Ok(customer) => match savepoint.commit().await {
            Ok(()) => customer,
            Err(e) => {
                warn!(shop_id = %shop_id, error = %e, "Customer resolution discarded");
                None
            }
        },
        Err(e) => {
            if let Err(rollback) = savepoint.rollback().await {
                warn!(shop_id = %shop_id, error = %rollback, "Customer savepoint rollback failed");
            }
            warn!(
                shop_id = %shop_id,
                phone = ?input.phone,
                error = %e,
                "Customer resolution failed, sale continues without a customer link"
            );
            None
        }
    }
}

async fn resolve_in(
    conn: &mut SqliteConnection,
    shop_id: &str,
    input: &CustomerInput,
) -> DbResult<Option<Customer>> {
    if let Some(id) = input.id.as_deref() {
        if let Some(customer) = fetch_customer(conn, shop_id, id).await? {
            return Ok(Some(customer));
        }
        warn!(shop_id = %shop_id, customer_id = %id, "Unknown customer id, resolving by phone and name");
    }

    if let Some(phone) = input.phone.as_deref() {
        if let Some(customer) = find_by_phone(conn, shop_id, phone).await? {
            debug!(shop_id = %shop_id, customer_id = %customer.id, "Reusing customer by phone");
            return Ok(Some(customer));
        }
    }

    let Some(name) = input.name.as_deref() else {
        return Ok(None);
    };

    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        shop_id: shop_id.to_string(),
        name: name.to_string(),
        phone: input.phone.clone(),
        email: None,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO customers (id, shop_id, name, phone, email, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.shop_id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(customer.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(shop_id = %shop_id, customer_id = %customer.id, "Created customer");
    Ok(Some(customer))
}

pub(crate) async fn fetch_customer(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND shop_id = ?2");
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(customer)
}

async fn find_by_phone(
    conn: &mut SqliteConnection,
    shop_id: &str,
    phone: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE shop_id = ?1 AND phone = ?2");
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(shop_id)
        .bind(phone)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(customer)
}

/// Read access to a shop's customers.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_customer(&mut conn, shop_id, id).await
    }

    pub async fn count(&self, shop_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE shop_id = ?1")
            .bind(shop_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn input(name: Option<&str>, phone: Option<&str>) -> CustomerInput {
        CustomerInput {
            id: None,
            name: name.map(str::to_string),
            phone: phone.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_phone_dedupes_within_shop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shop = db.shops().create("Velo Works").await.unwrap();
        let other = db.shops().create("Other Works").await.unwrap();

        let mut uow = db.begin_unit("test").await.unwrap();
        let first = resolve(uow.conn(), &shop.id, &input(Some("Ana"), Some("5550100")))
            .await
            .unwrap();
        let again = resolve(uow.conn(), &shop.id, &input(Some("Ana B."), Some("5550100")))
            .await
            .unwrap();
        let elsewhere = resolve(uow.conn(), &other.id, &input(Some("Ana"), Some("5550100")))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(first.id, again.id);
        assert_ne!(first.id, elsewhere.id);
        assert_eq!(db.customers().count(&shop.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_walk_ins_and_empty_input() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shop = db.shops().create("Velo Works").await.unwrap();

        let mut uow = db.begin_unit("test").await.unwrap();
        let a = resolve(uow.conn(), &shop.id, &input(Some("Walk-in"), None)).await;
        let b = resolve(uow.conn(), &shop.id, &input(Some("Walk-in"), None)).await;
        let none = resolve(uow.conn(), &shop.id, &CustomerInput::default()).await;
        let phone_only = resolve(uow.conn(), &shop.id, &input(None, Some("5550199"))).await;
        uow.commit().await.unwrap();

        assert_ne!(a.unwrap().id, b.unwrap().id);
        assert!(none.is_none());
        assert!(phone_only.is_none());
    }

    #[tokio::test]
    async fn test_existing_id_must_belong_to_shop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shop = db.shops().create("Velo Works").await.unwrap();
        let other = db.shops().create("Other Works").await.unwrap();

        let mut uow = db.begin_unit("test").await.unwrap();
        let ana = resolve(uow.conn(), &shop.id, &input(Some("Ana"), None))
            .await
            .unwrap();

        let by_id = CustomerInput {
            id: Some(ana.id.clone()),
            ..Default::default()
        };
        let same = resolve(uow.conn(), &shop.id, &by_id).await;
        let leaked = resolve(uow.conn(), &other.id, &by_id).await;
        uow.commit().await.unwrap();

        assert_eq!(same.map(|c| c.id), Some(ana.id));
        assert!(leaked.is_none());
    }
}
