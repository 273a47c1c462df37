//! # velo-core: Pure Business Logic for Velo POS
//!
//! Everything the bike-shop register and workshop agree on, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Velo POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Transport (HTTP / CLI, not in this workspace)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                velo-db (persistence + workflows)                │   │
//! │  │   checkout • repair lifecycle • conversion • returns            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ velo-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │  cart   │ │  sale   │ │ repair  │ │ returns │  │   │
//! │  │   │  Money  │ │Checkout │ │  Sale   │ │RepairJob│ │ refund  │  │   │
//! │  │   │         │ │LineKind │ │SaleItem │ │JobStatus│ │  math   │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │   numbering • conversion • validation • types • error          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Shop, Product, Customer, PaymentMethod, ActorContext
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Checkout request and line classification
//! - [`sale`] - Sale, SaleItem, Service and their statuses
//! - [`repair`] - Repair job aggregate and status machine
//! - [`conversion`] - Repair job → sale billing plan
//! - [`returns`] - Refund arithmetic and return-status derivation
//! - [`numbering`] - Invoice / job number format
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules
//!
//! ## Example Usage
//!
//! ```rust
//! use velo_core::cart::{CartLine, Checkout};
//!
//! let cart = Checkout::new("cash")
//!     .line(CartLine::product("prod-tube", 2, 1000))
//!     .classify()
//!     .unwrap();
//!
//! let totals = cart.totals();
//! assert_eq!(totals.subtotal.cents(), 2000);
//! assert_eq!(totals.total.cents(), 2000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod conversion;
pub mod error;
pub mod money;
pub mod numbering;
pub mod repair;
pub mod returns;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use repair::{JobStatus, JobType, Priority, RepairJob};
pub use sale::{
    NewService, Sale, SaleDetail, SaleItem, SaleLine, SaleStatus, Service, ServiceStatus,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines (items plus services) in a single checkout.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches typos at the register (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
