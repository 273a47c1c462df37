//! # Shop Repository

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use velo_core::Shop;

#[derive(Debug, Clone)]
pub struct ShopRepository {
    pool: SqlitePool,
}

impl ShopRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShopRepository { pool }
    }

    /// Registers a shop.
    pub async fn create(&self, name: &str) -> DbResult<Shop> {
        let shop = Shop {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        debug!(shop_id = %shop.id, name = %shop.name, "Creating shop");

        sqlx::query("INSERT INTO shops (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&shop.id)
            .bind(&shop.name)
            .bind(shop.created_at)
            .execute(&self.pool)
            .await?;

        Ok(shop)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shop>> {
        let mut conn = self.pool.acquire().await?;
        fetch_shop(&mut conn, id).await
    }
}

pub(crate) async fn fetch_shop(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Shop>> {
    let shop = sqlx::query_as::<_, Shop>("SELECT id, name, created_at FROM shops WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(shop)
}
