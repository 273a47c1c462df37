//! # Workflows
//!
//! The operations a register or workshop screen calls. Each one opens a
//! single [`crate::UnitOfWork`], runs every read and write on its
//! connection, and commits or rolls back as a whole.
//!
//! - [`sale::SaleManager`] - Checkout, cancellation, service records
//! - [`repair::RepairManager`] - Repair job lifecycle
//! - [`conversion::ConversionManager`] - Completed job → sale
//! - [`returns::ReturnManager`] - Item and full returns

pub mod conversion;
pub mod repair;
pub mod returns;
pub mod sale;
