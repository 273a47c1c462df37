//! # Error Types
//!
//! Domain-specific error types for velo-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  velo-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  │   ├── validation:  EmptyCart, InvalidPaymentMethod, OverReturn,     │
//! │  │   │                InvalidTransition, InvalidLineItem               │
//! │  │   └── resource:    ProductNotFoundInShop, InsufficientStock,        │
//! │  │                    JobNotFound, JobNotCompleted, JobAlreadyBilled,  │
//! │  │                    CannotDeleteBilledJob, ...                       │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  velo-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── PosError         - Domain(CoreError) | TransactionAborted(DbError)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, job number, quantities)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The cart has no product, manual or service line.
    #[error("At least one product or service is required")]
    EmptyCart,

    /// A cart line references a product that does not exist in the
    /// caller's shop.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist at all
    /// - Product belongs to another shop (never reported differently, so
    ///   other tenants' catalogs cannot be probed)
    #[error("Product with ID {product_id} not found in your shop")]
    ProductNotFoundInShop { product_id: String },

    /// Insufficient stock to complete a sale or consume a repair part.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart line (Brake Pad, qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=2
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Brake Pad", available: 2, requested: 5 }
    /// ```
    #[error("Insufficient stock for product: {product}, available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Payment method is not one of the accepted tenders.
    #[error("Invalid payment method '{0}': expected one of cash, credit_card, debit_card, mobile_payment, other")]
    InvalidPaymentMethod(String),

    /// A cart line is neither a product, a manual item nor a service, or
    /// claims to be more than one of them.
    #[error("Invalid cart line at position {position}: {reason}")]
    InvalidLineItem { position: usize, reason: String },

    /// Shop cannot be found.
    #[error("Shop not found: {0}")]
    ShopNotFound(String),

    /// Sale cannot be found in the caller's shop.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Sale item cannot be found on the sale.
    #[error("Item {item_id} not found in sale {sale_id}")]
    ItemNotFound { sale_id: String, item_id: String },

    /// Sale is not in a state that allows the requested operation.
    #[error("Sale {invoice_number} is {status}, cannot {operation}")]
    InvalidSaleStatus {
        invoice_number: String,
        status: String,
        operation: String,
    },

    /// Attempt to return more units than remain unreturned on an item.
    #[error("Cannot return {requested} of {item}: only {available} available for return")]
    OverReturn {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Repair job cannot be found in the caller's shop.
    #[error("Repair job not found: {0}")]
    JobNotFound(String),

    /// Requested repair job status change is not allowed.
    #[error("Repair job {job_number} cannot move from {from} to {to}")]
    InvalidTransition {
        job_number: String,
        from: String,
        to: String,
    },

    /// Conversion requested for a job that is not completed.
    #[error("Repair job {job_number} must be completed before converting to sale (status: {status})")]
    JobNotCompleted { job_number: String, status: String },

    /// Job already has a sale attached.
    #[error("Repair job {job_number} has already been billed")]
    JobAlreadyBilled { job_number: String },

    /// Billed jobs are permanent records.
    #[error("Cannot delete billed repair job {job_number}")]
    CannotDeleteBilledJob { job_number: String },

    /// Parts, labor and services cannot be added to a closed job.
    #[error("Repair job {job_number} is {status} and can no longer be modified")]
    JobClosed { job_number: String, status: String },

    /// Service record cannot be found.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for the errors that name a missing or exhausted resource
    /// rather than malformed input.
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFoundInShop { .. }
                | CoreError::InsufficientStock { .. }
                | CoreError::ShopNotFound(_)
                | CoreError::SaleNotFound(_)
                | CoreError::ItemNotFound { .. }
                | CoreError::JobNotFound(_)
                | CoreError::JobNotCompleted { .. }
                | CoreError::JobAlreadyBilled { .. }
                | CoreError::CannotDeleteBilledJob { .. }
                | CoreError::JobClosed { .. }
                | CoreError::ServiceNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any storage work begins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_names_product_and_quantities() {
        let err = CoreError::InsufficientStock {
            product: "Brake Pad".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product: Brake Pad, available 2, requested 5"
        );
    }

    #[test]
    fn test_over_return_message() {
        let err = CoreError::OverReturn {
            item: "Inner Tube".to_string(),
            available: 1,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Cannot return 3 of Inner Tube: only 1 available for return"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(!core_err.is_resource_error());
    }

    #[test]
    fn test_resource_classification() {
        assert!(CoreError::JobNotFound("x".into()).is_resource_error());
        assert!(!CoreError::EmptyCart.is_resource_error());
        assert!(!CoreError::InvalidPaymentMethod("bitcoin".into()).is_resource_error());
    }
}
