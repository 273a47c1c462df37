//! # Domain Types
//!
//! Tenant, catalog and customer types shared by every workflow.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Shop       │   │    Product      │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │──►│  shop_id        │   │  shop_id        │       │
//! │  │  name → prefix  │   │  quantity >= 0  │   │  phone (unique  │       │
//! │  └─────────────────┘   │  cost_cents     │   │   within shop)  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │ PaymentMethod   │   │  ActorContext   │                             │
//! │  │  cash           │   │  shop_id        │  ← every operation is       │
//! │  │  credit_card    │   │  user_id        │    scoped by this           │
//! │  │  debit_card     │   └─────────────────┘                             │
//! │  │  mobile_payment │                                                    │
//! │  │  other          │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::money::Money;
use crate::numbering;

// =============================================================================
// Shop
// =============================================================================

/// Tenant boundary. Every other entity carries a `shop_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shop {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Shop {
    /// Prefix for invoice and job numbers, e.g. `VEL9A` for "Velo Works".
    pub fn number_prefix(&self) -> String {
        numbering::number_prefix(&self.name, &self.id)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// `quantity` is only ever changed by the inventory ledger and never
/// drops below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub shop_id: String,
    pub sku: Option<String>,
    pub name: String,
    /// Shelf price in cents.
    pub price_cents: i64,
    /// Purchase cost in cents (0 when unknown).
    pub cost_cents: i64,
    /// Stock on hand.
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Checks if `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }

    /// Cost to snapshot onto a sale line.
    ///
    /// The stored product cost wins when it is set. A client-supplied cost
    /// is only used when the product has none and the value is positive.
    pub fn snapshot_cost(&self, client_cost_cents: Option<i64>) -> i64 {
        if self.cost_cents > 0 {
            return self.cost_cents;
        }
        match client_cost_cents {
            Some(cost) if cost > 0 => cost,
            _ => 0,
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A shop customer, created lazily at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    MobilePayment,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::MobilePayment,
        PaymentMethod::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::MobilePayment => "mobile_payment",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| CoreError::InvalidPaymentMethod(s.to_string()))
    }
}

// =============================================================================
// Actor Context
// =============================================================================

/// Authenticated caller: the shop every read and write is scoped to, and
/// the user recorded as cashier / author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub shop_id: String,
    pub user_id: Option<String>,
}

impl ActorContext {
    pub fn new(shop_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        ActorContext {
            shop_id: shop_id.into(),
            user_id: Some(user_id.into()),
        }
    }

    /// Context for system jobs (seeding, imports) with no signed-in user.
    pub fn system(shop_id: impl Into<String>) -> Self {
        ActorContext {
            shop_id: shop_id.into(),
            user_id: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(cost_cents: i64, quantity: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".into(),
            shop_id: "s1".into(),
            sku: None,
            name: "Brake Pad".into(),
            price_cents: 1000,
            cost_cents,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_payment_method_parses_known_tenders() {
        assert_eq!("cash".parse::<PaymentMethod>(), Ok(PaymentMethod::Cash));
        assert_eq!(
            "mobile_payment".parse::<PaymentMethod>(),
            Ok(PaymentMethod::MobilePayment)
        );
        assert_eq!(
            "bitcoin".parse::<PaymentMethod>(),
            Err(CoreError::InvalidPaymentMethod("bitcoin".into()))
        );
        // The old "credit" spelling is no longer a tender.
        assert!("credit".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_payment_method_round_trips_through_as_str() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>(), Ok(method));
        }
    }

    #[test]
    fn test_snapshot_cost_prefers_stored_cost() {
        assert_eq!(product(400, 1).snapshot_cost(Some(999)), 400);
        assert_eq!(product(0, 1).snapshot_cost(Some(350)), 350);
        assert_eq!(product(0, 1).snapshot_cost(Some(-5)), 0);
        assert_eq!(product(0, 1).snapshot_cost(None), 0);
    }

    #[test]
    fn test_can_sell() {
        assert!(product(0, 5).can_sell(5));
        assert!(!product(0, 5).can_sell(6));
    }
}
