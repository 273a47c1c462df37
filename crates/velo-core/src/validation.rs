//! # Validation Module
//!
//! Input validation utilities for Velo POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (out of this workspace)                            │
//! │  └── Deserialization of the cart / job payload                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: velo-core (THIS MODULE + cart classification)                │
//! │  └── Field rules checked before any unit of work starts                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (quantity >= 0), CHECK (returned_quantity <= quantity)      │
//! │  ├── UNIQUE (shop_id, invoice_number), UNIQUE (shop_id, job_number)    │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, manual item, service, part).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use velo_core::validation::validate_name;
///
/// assert!(validate_name("name", "Tube 700x25").is_ok());
/// assert!(validate_name("name", "  ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Normalizes an optional phone number: trims, and treats blank as absent.
pub fn normalize_phone(phone: Option<&str>) -> Option<String> {
    phone
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a non-negative amount in cents (price, discount, tax, deposit).
///
/// ## Example
/// ```rust
/// use velo_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("price", 1099).is_ok());
/// assert!(validate_amount_cents("price", 0).is_ok());
/// assert!(validate_amount_cents("price", -100).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a line discount: non-negative and at most the line's gross
/// `price × qty`, so a line never totals below zero.
///
/// ```rust
/// use velo_core::validation::validate_line_discount;
///
/// assert!(validate_line_discount(300, 800, 3).is_ok());
/// assert!(validate_line_discount(2400, 800, 3).is_ok());
/// assert!(validate_line_discount(2401, 800, 3).is_err());
/// ```
pub fn validate_line_discount(
    discount_cents: i64,
    price_cents: i64,
    quantity: i64,
) -> ValidationResult<()> {
    validate_amount_cents("discount", discount_cents)?;

    let gross = price_cents.saturating_mul(quantity);
    if discount_cents > gross {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: gross,
        });
    }

    Ok(())
}

/// Validates labor hours expressed in hundredths of an hour.
pub fn validate_hours_hundredths(hundredths: i64) -> ValidationResult<()> {
    if hundredths <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "hours".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
