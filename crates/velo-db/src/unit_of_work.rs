//! # Unit of Work
//!
//! One atomic write: the process-wide write gate plus a SQLite transaction.
//!
//! ```text
//!   begin_unit("create_sale")
//!        │  lock gate, BEGIN
//!        ▼
//!   ┌──────────────────────────────────────────────┐
//!   │  stock decrements, number allocation,        │
//!   │  customer savepoint, sale + items, services, │
//!   │  repair job flips                            │
//!   └──────────────────────────────────────────────┘
//!        │
//!        ├── Ok  → COMMIT, release gate
//!        └── Err → ROLLBACK, release gate   (also on drop)
//! ```

use sqlx::{Sqlite, SqliteConnection, Transaction};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info};

use crate::error::{DbError, PosError, PosResult};

/// An open unit of work. Dropping it without [`UnitOfWork::commit`]
/// rolls the transaction back.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    _gate: OwnedMutexGuard<()>,
    operation: &'static str,
}

impl UnitOfWork {
    pub(crate) fn new(
        tx: Transaction<'static, Sqlite>,
        gate: OwnedMutexGuard<()>,
        operation: &'static str,
    ) -> Self {
        UnitOfWork {
            tx,
            _gate: gate,
            operation,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The connection every statement of this unit runs on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> PosResult<()> {
        let operation = self.operation;
        self.tx.commit().await.map_err(|e| {
            error!(operation, error = %e, "Commit failed");
            PosError::TransactionAborted(DbError::TransactionFailed(e.to_string()))
        })?;
        debug!(operation, "Unit of work committed");
        Ok(())
    }

    /// Rolls back. A failing rollback is logged; SQLite discards the
    /// transaction when the connection is reset anyway.
    pub async fn rollback(self) {
        let operation = self.operation;
        if let Err(e) = self.tx.rollback().await {
            error!(operation, error = %e, "Rollback failed");
        }
    }

    /// Commits on `Ok`, rolls back on `Err`.
    ///
    /// Storage failures are logged at `error`; rejected business rules at
    /// `info`.
    pub async fn finish<T>(self, result: PosResult<T>) -> PosResult<T> {
        let operation = self.operation;
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                self.rollback().await;
                match &err {
                    PosError::TransactionAborted(cause) => {
                        error!(operation, error = %cause, "Unit of work aborted");
                    }
                    PosError::Domain(reason) => {
                        info!(operation, reason = %reason, "Unit of work rejected");
                    }
                }
                Err(err)
            }
        }
    }
}
