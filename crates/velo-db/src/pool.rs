//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Handle                                    │
//! │                                                                         │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ├──► SqlitePool           reads (get_sale, list_repair_jobs)     │
//! │       │                                                                 │
//! │       └──► write gate (Mutex)   one UnitOfWork at a time per process   │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │            UnitOfWork = gate guard + BEGIN … COMMIT / ROLLBACK          │
//! │                                                                         │
//! │  Cross-process writers are held off by SQLite's own locking and the    │
//! │  conditional updates / unique indexes in the schema.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so readers don't block
//! the open unit of work and vice versa.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::customer::CustomerRepository;
use crate::migrations;
use crate::repository::product::ProductRepository;
use crate::repository::shop::ShopRepository;
use crate::unit_of_work::UnitOfWork;
use crate::workflow::conversion::ConversionManager;
use crate::workflow::repair::RepairManager;
use crate::workflow::returns::ReturnManager;
use crate::workflow::sale::SaleManager;

const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool and storage settings.
///
/// `PosConfig::db_config()` builds one from the environment; tests use
/// [`DbConfig::in_memory`].
///
/// ```rust,ignore
/// let config = DbConfig::new("./data/velo.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first connect.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long `acquire` waits for a free connection.
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    /// How long a writer waits on another process' lock before the unit
    /// of work fails.
    pub busy_timeout: Duration,
    pub run_migrations: bool,
    /// Whether a failed sequence allocation may fall back to a
    /// timestamp-based number.
    pub numbering_fallback: bool,
}

impl DbConfig {
    /// Defaults for a single register: 5 connections, 5s busy timeout,
    /// migrations on, numbering fallback on.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            numbering_fallback: true,
        }
    }

    /// A private database that disappears with the pool.
    ///
    /// Capped at one connection: every `:memory:` connection would
    /// otherwise open its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..DbConfig::new(IN_MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn numbering_fallback(mut self, allow: bool) -> Self {
        self.numbering_fallback = allow;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repositories, workflow managers and units
/// of work.
///
/// Cloning is cheap; clones share the pool and the write gate.
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Serializes write units within this process.
    write_gate: Arc<Mutex<()>>,

    numbering_fallback: bool,
}

impl Database {
    /// Opens the pool and brings the schema up to date.
    ///
    /// Every connection runs in WAL mode with `synchronous = NORMAL`,
    /// foreign keys on and the configured busy timeout.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = if config.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", config.database_path.display())
        };

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        // An in-memory database lives only as long as its one connection.
        let recycle = !config.is_in_memory();

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(recycle.then_some(config.idle_timeout))
            .max_lifetime(recycle.then_some(Duration::from_secs(30 * 60)))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            write_gate: Arc::new(Mutex::new(())),
            numbering_fallback: config.numbering_fallback,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Called by [`Database::new`] unless
    /// `run_migrations` is off.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn numbering_fallback(&self) -> bool {
        self.numbering_fallback
    }

    /// Opens a unit of work: waits for the write gate, then begins a
    /// transaction.
    ///
    /// `operation` names the unit in logs.
    pub async fn begin_unit(&self, operation: &'static str) -> DbResult<UnitOfWork> {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!(operation, "Unit of work started");
        Ok(UnitOfWork::new(tx, gate, operation))
    }

    pub fn shops(&self) -> ShopRepository {
        ShopRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    /// Checkout, sale lookup, cancellation and service records.
    pub fn sales(&self) -> SaleManager {
        SaleManager::new(self.clone())
    }

    pub fn repairs(&self) -> RepairManager {
        RepairManager::new(self.clone())
    }

    pub fn conversions(&self) -> ConversionManager {
        ConversionManager::new(self.clone())
    }

    pub fn returns(&self) -> ReturnManager {
        ReturnManager::new(self.clone())
    }

    /// Closes the pool; later operations fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let config = DbConfig::in_memory();
        let db = Database::new(config).await.unwrap();

        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .numbering_fallback(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.numbering_fallback);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_units_are_serialized() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = db.begin_unit("first").await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(50), db.begin_unit("second")).await;
        assert!(second.is_err(), "second unit must wait for the first");

        first.rollback().await;
        let second = db.begin_unit("second").await.unwrap();
        second.rollback().await;
    }
}
