//! # Checkout Cart
//!
//! The cart as it arrives at checkout, and its classification into typed
//! lines.
//!
//! ## Classification
//! ```text
//!   CartLine (wire)                          LineKind
//!   ───────────────                          ────────
//!   product_id = Some, flags clear    ──►    Product(ProductLine)
//!   is_manual, name, no product_id    ──►    Manual(ManualLine)
//!   is_service, name                  ──►    Service(ServiceLine)
//!   anything else                     ──►    InvalidLineItem
//! ```
//!
//! Product and manual lines become sale items in cart order. Service lines
//! (inline or from the cart's `services` list) become service records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::PaymentMethod;
use crate::validation::{
    normalize_phone, validate_amount_cents, validate_line_discount, validate_name, validate_quantity,
};
use crate::MAX_CART_LINES;

// =============================================================================
// Wire Types
// =============================================================================

/// One cart line as sent by the register.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Option<String>,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub is_service: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: i64,
    pub price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    pub cost_price_cents: Option<i64>,
    /// Line total for service lines; derived when absent.
    pub total_cents: Option<i64>,
    /// Quick-service repair job this service line bills.
    pub repair_job_id: Option<String>,
}

impl CartLine {
    /// A stocked product line.
    pub fn product(product_id: impl Into<String>, quantity: i64, price_cents: i64) -> Self {
        CartLine {
            product_id: Some(product_id.into()),
            quantity,
            price_cents,
            ..Default::default()
        }
    }

    /// A free-form line naming something that isn't in the catalog.
    pub fn manual(name: impl Into<String>, quantity: i64, price_cents: i64) -> Self {
        CartLine {
            is_manual: true,
            name: Some(name.into()),
            quantity,
            price_cents,
            ..Default::default()
        }
    }

    /// An inline service line.
    pub fn service(name: impl Into<String>, quantity: i64, price_cents: i64) -> Self {
        CartLine {
            is_service: true,
            name: Some(name.into()),
            quantity,
            price_cents,
            ..Default::default()
        }
    }

    pub fn with_discount(mut self, discount_cents: i64) -> Self {
        self.discount_cents = discount_cents;
        self
    }

    pub fn with_cost_price(mut self, cost_price_cents: i64) -> Self {
        self.cost_price_cents = Some(cost_price_cents);
        self
    }

    pub fn for_repair_job(mut self, repair_job_id: impl Into<String>) -> Self {
        self.repair_job_id = Some(repair_job_id.into());
        self
    }

    /// Classifies this line. `position` is its zero-based index in the cart.
    pub fn classify(&self, position: usize) -> CoreResult<LineKind> {
        let invalid = |reason: &str| CoreError::InvalidLineItem {
            position,
            reason: reason.to_string(),
        };

        let product_id = self
            .product_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        validate_quantity(self.quantity)?;
        validate_amount_cents("price", self.price_cents)?;
        validate_line_discount(self.discount_cents, self.price_cents, self.quantity)?;
        if let Some(total) = self.total_cents {
            validate_amount_cents("total", total)?;
        }

        if self.is_service {
            if self.is_manual || product_id.is_some() {
                return Err(invalid("a service line cannot also be a product or manual item"));
            }
            let name = name.ok_or_else(|| invalid("a service line requires a name"))?;
            validate_name("name", name)?;
            return Ok(LineKind::Service(ServiceLine {
                name: name.to_string(),
                description: self.description.clone(),
                quantity: self.quantity,
                price_cents: self.price_cents,
                discount_cents: self.discount_cents,
                cost_price_cents: self.cost_price_cents.unwrap_or(0).max(0),
                total_cents: self.total_cents,
                repair_job_id: self.repair_job_id.clone(),
            }));
        }

        if self.repair_job_id.is_some() {
            return Err(invalid("only service lines can bill a repair job"));
        }

        match (self.is_manual, product_id) {
            (true, Some(_)) => Err(invalid("a manual item cannot reference a product")),
            (true, None) => {
                let name = name.ok_or_else(|| invalid("a manual item requires a name"))?;
                validate_name("name", name)?;
                Ok(LineKind::Manual(ManualLine {
                    name: name.to_string(),
                    quantity: self.quantity,
                    price_cents: self.price_cents,
                    discount_cents: self.discount_cents,
                }))
            }
            (false, Some(id)) => Ok(LineKind::Product(ProductLine {
                product_id: id.to_string(),
                quantity: self.quantity,
                price_cents: self.price_cents,
                discount_cents: self.discount_cents,
                client_cost_cents: self.cost_price_cents,
            })),
            (false, None) => Err(invalid(
                "line must reference a product or be marked as a manual item",
            )),
        }
    }
}

/// The checkout request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    #[serde(default)]
    pub items: Vec<CartLine>,
    /// Separately listed services, billed alongside `items`.
    #[serde(default)]
    pub services: Vec<ServiceLine>,
    /// Caller-computed subtotal. Kept as-is when present.
    pub subtotal_cents: Option<i64>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    /// Caller-computed total. Authoritative when present.
    pub total_cents: Option<i64>,
    pub payment_method: String,
    /// Tender-specific details (card last four, cash tendered, ...).
    pub payment_details: Option<serde_json::Value>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
}

impl Checkout {
    pub fn new(payment_method: impl Into<String>) -> Self {
        Checkout {
            payment_method: payment_method.into(),
            ..Default::default()
        }
    }

    pub fn line(mut self, line: CartLine) -> Self {
        self.items.push(line);
        self
    }

    pub fn customer(mut self, name: impl Into<String>, phone: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self.customer_phone = Some(phone.into());
        self
    }

    /// Validates and classifies the whole cart.
    ///
    /// Fails fast on the first invalid line; no storage work is needed to
    /// reject a malformed cart.
    pub fn classify(&self) -> CoreResult<ClassifiedCart> {
        if self.items.is_empty() && self.services.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        if self.items.len() + self.services.len() > MAX_CART_LINES {
            return Err(ValidationError::OutOfRange {
                field: "cart lines".to_string(),
                min: 1,
                max: MAX_CART_LINES as i64,
            }
            .into());
        }

        let payment_method: PaymentMethod = self.payment_method.parse()?;
        validate_amount_cents("discount", self.discount_cents)?;
        validate_amount_cents("tax", self.tax_cents)?;

        let mut goods = Vec::with_capacity(self.items.len());
        let mut services = Vec::new();
        for (position, line) in self.items.iter().enumerate() {
            match line.classify(position)? {
                LineKind::Product(p) => goods.push(GoodsLine::Product(p)),
                LineKind::Manual(m) => goods.push(GoodsLine::Manual(m)),
                LineKind::Service(s) => services.push(s),
            }
        }
        for service in &self.services {
            service.validate()?;
            services.push(service.clone());
        }

        Ok(ClassifiedCart {
            goods,
            services,
            payment_method,
            subtotal_cents: self.subtotal_cents,
            discount_cents: self.discount_cents,
            tax_cents: self.tax_cents,
            total_cents: self.total_cents,
            customer: CustomerInput {
                id: self
                    .customer_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
                name: self
                    .customer_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
                phone: normalize_phone(self.customer_phone.as_deref()),
            },
        })
    }
}

// =============================================================================
// Classified Lines
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Product(ProductLine),
    Manual(ManualLine),
    Service(ServiceLine),
}

/// A line that becomes a sale item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoodsLine {
    Product(ProductLine),
    Manual(ManualLine),
}

impl GoodsLine {
    pub fn quantity(&self) -> i64 {
        match self {
            GoodsLine::Product(p) => p.quantity,
            GoodsLine::Manual(m) => m.quantity,
        }
    }

    pub fn gross(&self) -> Money {
        match self {
            GoodsLine::Product(p) => Money::from_cents(p.price_cents) * p.quantity,
            GoodsLine::Manual(m) => Money::from_cents(m.price_cents) * m.quantity,
        }
    }

    pub fn discount(&self) -> Money {
        match self {
            GoodsLine::Product(p) => Money::from_cents(p.discount_cents),
            GoodsLine::Manual(m) => Money::from_cents(m.discount_cents),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLine {
    pub product_id: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub discount_cents: i64,
    pub client_cost_cents: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualLine {
    pub name: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub discount_cents: i64,
}

/// A service billed at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLine {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i64,
    pub price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub cost_price_cents: i64,
    pub total_cents: Option<i64>,
    pub repair_job_id: Option<String>,
}

impl ServiceLine {
    pub fn validate(&self) -> CoreResult<()> {
        validate_name("service name", &self.name)?;
        validate_quantity(self.quantity)?;
        validate_amount_cents("price", self.price_cents)?;
        validate_line_discount(self.discount_cents, self.price_cents, self.quantity)?;
        validate_amount_cents("cost price", self.cost_price_cents)?;
        if let Some(total) = self.total_cents {
            validate_amount_cents("total", total)?;
        }
        Ok(())
    }

    /// Line total: the caller's value, else `price × qty − discount`.
    pub fn total(&self) -> Money {
        match self.total_cents {
            Some(total) => Money::from_cents(total),
            None => {
                Money::from_cents(self.price_cents) * self.quantity
                    - Money::from_cents(self.discount_cents)
            }
        }
    }
}

/// Customer fields from the checkout, normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl CustomerInput {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.phone.is_none()
    }
}

// =============================================================================
// Classified Cart
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedCart {
    /// Product and manual lines in cart order.
    pub goods: Vec<GoodsLine>,
    pub services: Vec<ServiceLine>,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: Option<i64>,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: Option<i64>,
    pub customer: CustomerInput,
}

/// Final monetary figures of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Money,
    /// Σ price × qty over product and manual lines.
    pub computed_subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl SaleTotals {
    /// Caller subtotal differs from the server's own sum.
    pub fn subtotal_mismatch(&self) -> bool {
        self.subtotal != self.computed_subtotal
    }
}

impl ClassifiedCart {
    pub fn has_products(&self) -> bool {
        self.goods
            .iter()
            .any(|line| matches!(line, GoodsLine::Product(_)))
    }

    /// Requested units per product, summed across repeated lines.
    pub fn requested_by_product(&self) -> BTreeMap<&str, i64> {
        let mut requested = BTreeMap::new();
        for line in &self.goods {
            if let GoodsLine::Product(p) = line {
                *requested.entry(p.product_id.as_str()).or_insert(0) += p.quantity;
            }
        }
        requested
    }

    pub fn computed_subtotal(&self) -> Money {
        self.goods.iter().map(GoodsLine::gross).sum()
    }

    pub fn line_discounts(&self) -> Money {
        self.goods.iter().map(GoodsLine::discount).sum()
    }

    /// Resolves the sale's figures.
    ///
    /// A caller subtotal is preserved. A caller total is authoritative;
    /// without one, `total = subtotal − discount − line discounts + tax`.
    pub fn totals(&self) -> SaleTotals {
        let computed_subtotal = self.computed_subtotal();
        let subtotal = self
            .subtotal_cents
            .map(Money::from_cents)
            .unwrap_or(computed_subtotal);
        let discount = Money::from_cents(self.discount_cents);
        let tax = Money::from_cents(self.tax_cents);
        let total = match self.total_cents {
            Some(total) => Money::from_cents(total),
            None => subtotal - discount - self.line_discounts() + tax,
        };

        SaleTotals {
            subtotal,
            computed_subtotal,
            discount,
            tax,
            total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
