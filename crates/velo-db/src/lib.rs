//! # velo-db: Persistence and Workflows for Velo POS
//!
//! SQLite storage through sqlx, plus the atomic operations the register
//! and the workshop run against it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Velo POS Data Flow                               │
//! │                                                                         │
//! │  Transport (create sale, add part, convert job, return item)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     velo-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   workflow/    SaleManager • RepairManager                      │   │
//! │  │                ConversionManager • ReturnManager                │   │
//! │  │       │                                                         │   │
//! │  │       ▼  one UnitOfWork per operation                           │   │
//! │  │   sequence • inventory • customer      (allocator, ledger,      │   │
//! │  │   repository/ (row access)              resolver)               │   │
//! │  │       │                                                         │   │
//! │  │       ▼                                                         │   │
//! │  │   Database (pool.rs) ── write gate ── migrations (embedded)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, write gate, entry point to everything else
//! - [`unit_of_work`] - Transaction wrapper shared by all workflows
//! - [`workflow`] - Checkout, repair lifecycle, conversion, returns
//! - [`sequence`] - Invoice / job number allocation
//! - [`inventory`] - Conditional stock decrement and restock
//! - [`customer`] - Best-effort customer resolution
//! - [`repository`] - Row-level access
//! - [`migrations`] - Embedded schema
//! - [`config`] - Environment configuration
//! - [`error`] - DbError and PosError
//!
//! ## Usage
//!
//! ```rust,ignore
//! use velo_core::cart::{CartLine, Checkout};
//! use velo_core::ActorContext;
//! use velo_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("velo.db")).await?;
//! let shop = db.shops().create("Velo Works").await?;
//! let actor = ActorContext::new(&shop.id, "cashier-1");
//!
//! let checkout = Checkout::new("cash").line(CartLine::manual("Bell", 1, 900));
//! let detail = db.sales().create_sale(&actor, &checkout).await?;
//! println!("{}", detail.sale.invoice_number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod customer;
pub mod error;
pub mod inventory;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sequence;
pub mod unit_of_work;
pub mod workflow;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, PosConfig};
pub use error::{DbError, DbResult, PosError, PosResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

pub use customer::CustomerRepository;
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::shop::ShopRepository;

pub use workflow::conversion::{Conversion, ConversionManager};
pub use workflow::repair::RepairManager;
pub use workflow::returns::ReturnManager;
pub use workflow::sale::SaleManager;
