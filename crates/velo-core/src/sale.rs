//! # Sales
//!
//! Persisted sale, its items, its return and status history, and the
//! service records billed alongside it.
//!
//! ## Sale Status
//! ```text
//!              return some units           return the rest
//!  completed ───────────────────► partially_returned ───────► returned
//!      │    ────────────────────────────────────────────────►    ▲
//!      │                      return every unit                  │
//!      │ cancel (no returns yet)
//!      ▼
//!  cancelled
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cart::ServiceLine;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Customer, PaymentMethod};

// =============================================================================
// Status
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
    PartiallyReturned,
    Returned,
    Cancelled,
}

impl SaleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::PartiallyReturned => "partially_returned",
            SaleStatus::Returned => "returned",
            SaleStatus::Cancelled => "cancelled",
        }
    }

    /// Whether units can still be returned against a sale in this status.
    pub const fn accepts_returns(&self) -> bool {
        matches!(self, SaleStatus::Completed | SaleStatus::PartiallyReturned)
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// What a sale item refers to.
///
/// Manual items have no product, and never touch inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaleLine {
    Product {
        product_id: String,
        /// Cost snapshot per unit at sale time.
        cost_price_cents: i64,
    },
    Manual,
}

/// A line of a sale. Name and price are snapshots taken at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub position: i64,
    #[serde(flatten)]
    pub line: SaleLine,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    /// Never exceeds `quantity`.
    pub returned_quantity: i64,
}

impl SaleItem {
    pub fn product_id(&self) -> Option<&str> {
        match &self.line {
            SaleLine::Product { product_id, .. } => Some(product_id),
            SaleLine::Manual => None,
        }
    }

    pub fn cost_price(&self) -> Money {
        match &self.line {
            SaleLine::Product {
                cost_price_cents, ..
            } => Money::from_cents(*cost_price_cents),
            SaleLine::Manual => Money::zero(),
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// `price × qty − discount`.
    pub fn line_total(&self) -> Money {
        self.unit_price() * self.quantity - Money::from_cents(self.discount_cents)
    }

    /// Units not yet returned.
    pub fn returnable(&self) -> i64 {
        self.quantity - self.returned_quantity
    }

    pub fn is_fully_returned(&self) -> bool {
        self.returned_quantity >= self.quantity
    }
}

// =============================================================================
// History
// =============================================================================

/// One accepted return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnRecord {
    pub id: String,
    pub sale_id: String,
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub amount_cents: i64,
    pub reason: Option<String>,
    pub actor_id: Option<String>,
    pub returned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StatusChange {
    pub id: String,
    pub sale_id: String,
    pub status: SaleStatus,
    pub reason: Option<String>,
    pub actor_id: Option<String>,
    pub changed_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub shop_id: String,
    /// Unique within the shop.
    pub invoice_number: String,
    pub customer_id: Option<String>,
    /// Customer snapshot at sale time.
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items: Vec<SaleItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_details: Option<serde_json::Value>,
    pub status: SaleStatus,
    pub returned_amount_cents: i64,
    /// Cashier.
    pub actor_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub return_history: Vec<ReturnRecord>,
    pub status_history: Vec<StatusChange>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn returned_amount(&self) -> Money {
        Money::from_cents(self.returned_amount_cents)
    }

    pub fn item(&self, item_id: &str) -> Option<&SaleItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Whether any unit of any item has been returned.
    pub fn has_returns(&self) -> bool {
        self.items.iter().any(|item| item.returned_quantity > 0)
    }

    /// Status implied by the items' returned quantities.
    pub fn derived_status(&self) -> SaleStatus {
        crate::returns::derive_status(&self.items)
    }
}

// =============================================================================
// Service Records
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Completed,
    Pending,
    Cancelled,
    Refunded,
}

impl ServiceStatus {
    pub const ALL: [ServiceStatus; 4] = [
        ServiceStatus::Completed,
        ServiceStatus::Pending,
        ServiceStatus::Cancelled,
        ServiceStatus::Refunded,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Completed => "completed",
            ServiceStatus::Pending => "pending",
            ServiceStatus::Cancelled => "cancelled",
            ServiceStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ServiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "service status".to_string(),
                allowed: ServiceStatus::ALL
                    .iter()
                    .map(|status| status.as_str().to_string())
                    .collect(),
            })
    }
}

/// A billed service. Created with a sale (`-SRV` invoice suffix) or on its
/// own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Service {
    pub id: String,
    pub shop_id: String,
    pub sale_id: Option<String>,
    pub repair_job_id: Option<String>,
    pub invoice_number: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_price_cents: i64,
    pub quantity: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub actor_id: Option<String>,
    pub status: ServiceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A service billed on its own, outside any checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub line: ServiceLine,
    pub payment_method: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
}

impl NewService {
    /// Validates the line and parses the tender.
    ///
    /// Repair jobs are only billed through a checkout, so a standalone
    /// service naming one is rejected.
    pub fn validate(&self) -> CoreResult<PaymentMethod> {
        if self.line.repair_job_id.is_some() {
            return Err(CoreError::InvalidLineItem {
                position: 0,
                reason: "standalone services cannot bill a repair job".to_string(),
            });
        }
        self.line.validate()?;
        self.payment_method.parse()
    }
}

/// A sale with everything billed alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub services: Vec<Service>,
    pub customer: Option<Customer>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, returned_quantity: i64) -> SaleItem {
        SaleItem {
            id: "i1".into(),
            sale_id: "s1".into(),
            position: 0,
            line: SaleLine::Product {
                product_id: "p1".into(),
                cost_price_cents: 400,
            },
            name: "Tube".into(),
            quantity,
            unit_price_cents: 800,
            discount_cents: 100,
            returned_quantity,
        }
    }

    #[test]
    fn test_item_figures() {
        let item = item(3, 1);
        assert_eq!(item.line_total().cents(), 2300);
        assert_eq!(item.returnable(), 2);
        assert_eq!(item.product_id(), Some("p1"));
        assert_eq!(item.cost_price().cents(), 400);
        assert!(!item.is_fully_returned());
    }

    #[test]
    fn test_manual_item_has_no_product() {
        let manual = SaleItem {
            line: SaleLine::Manual,
            ..item(1, 0)
        };
        assert_eq!(manual.product_id(), None);
        assert!(manual.cost_price().is_zero());
    }

    #[test]
    fn test_sale_item_serializes_kind_tag() {
        let json = serde_json::to_value(item(1, 0)).unwrap();
        assert_eq!(json["kind"], "product");
        assert_eq!(json["product_id"], "p1");
    }

    #[test]
    fn test_service_status_membership() {
        assert_eq!("refunded".parse::<ServiceStatus>(), Ok(ServiceStatus::Refunded));
        assert!(matches!(
            "archived".parse::<ServiceStatus>(),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_standalone_service_validation() {
        let mut input = NewService {
            line: ServiceLine {
                name: "Brake bleed".into(),
                quantity: 1,
                price_cents: 3500,
                ..Default::default()
            },
            payment_method: "debit_card".into(),
            ..Default::default()
        };
        assert_eq!(input.validate(), Ok(PaymentMethod::DebitCard));

        input.line.repair_job_id = Some("job-1".into());
        assert!(matches!(
            input.validate(),
            Err(CoreError::InvalidLineItem { position: 0, .. })
        ));
    }

    #[test]
    fn test_accepts_returns() {
        assert!(SaleStatus::Completed.accepts_returns());
        assert!(SaleStatus::PartiallyReturned.accepts_returns());
        assert!(!SaleStatus::Returned.accepts_returns());
        assert!(!SaleStatus::Cancelled.accepts_returns());
    }
}
