//! # Return Rules
//!
//! Pure arithmetic for returning sale items.
//!
//! A return of `n` units refunds `price × n` less its share of the item
//! discount, taken from the running returned total so split returns never
//! drift from the amount charged. Stock comes back only for product items.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::sale::{Sale, SaleItem, SaleStatus};
use crate::validation::validate_quantity;

/// What one item return does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReturn {
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub amount: Money,
    /// Product to restock, `None` for manual items.
    pub restock: Option<String>,
}

/// Refund owed for returning the next `quantity` units of an item.
///
/// The discount is prorated on the running returned total, so however an
/// item is split across returns its refunds add up to `price × qty −
/// discount` exactly.
pub fn refund_amount(item: &SaleItem, quantity: i64) -> Money {
    let discount = Money::from_cents(item.discount_cents);
    let already = item.returned_quantity;
    let discount_share = discount.prorate(already + quantity, item.quantity)
        - discount.prorate(already, item.quantity);
    item.unit_price() * quantity - discount_share
}

/// Checks the sale can take returns at all.
pub fn ensure_returnable(sale: &Sale) -> CoreResult<()> {
    if sale.status.accepts_returns() {
        Ok(())
    } else {
        Err(CoreError::InvalidSaleStatus {
            invoice_number: sale.invoice_number.clone(),
            status: sale.status.to_string(),
            operation: "accept returns".to_string(),
        })
    }
}

/// Plans returning `quantity` units of one item.
pub fn plan_item_return(item: &SaleItem, quantity: i64) -> CoreResult<ItemReturn> {
    validate_quantity(quantity)?;

    let available = item.returnable();
    if quantity > available {
        return Err(CoreError::OverReturn {
            item: item.name.clone(),
            available,
            requested: quantity,
        });
    }

    Ok(ItemReturn {
        item_id: item.id.clone(),
        item_name: item.name.clone(),
        quantity,
        amount: refund_amount(item, quantity),
        restock: item.product_id().map(str::to_string),
    })
}

/// Plans returning every outstanding unit of the sale. Items already fully
/// returned are skipped.
pub fn plan_full_return(sale: &Sale) -> CoreResult<Vec<ItemReturn>> {
    ensure_returnable(sale)?;

    Ok(sale
        .items
        .iter()
        .filter(|item| item.returnable() > 0)
        .map(|item| {
            let quantity = item.returnable();
            ItemReturn {
                item_id: item.id.clone(),
                item_name: item.name.clone(),
                quantity,
                amount: refund_amount(item, quantity),
                restock: item.product_id().map(str::to_string),
            }
        })
        .collect())
}

/// Status implied by returned quantities.
///
/// ```text
/// nothing returned  → completed
/// everything        → returned
/// otherwise         → partially_returned
/// ```
pub fn derive_status(items: &[SaleItem]) -> SaleStatus {
    if items.is_empty() || items.iter().all(|item| item.returned_quantity == 0) {
        SaleStatus::Completed
    } else if items.iter().all(SaleItem::is_fully_returned) {
        SaleStatus::Returned
    } else {
        SaleStatus::PartiallyReturned
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::SaleLine;
    use proptest::prelude::*;

    fn item(id: &str, quantity: i64, returned_quantity: i64, discount_cents: i64) -> SaleItem {
        SaleItem {
            id: id.into(),
            sale_id: "s1".into(),
            position: 0,
            line: SaleLine::Product {
                product_id: format!("prod-{id}"),
                cost_price_cents: 0,
            },
            name: format!("Item {id}"),
            quantity,
            unit_price_cents: 1000,
            discount_cents,
            returned_quantity,
        }
    }

    #[test]
    fn test_refund_prorates_discount() {
        // 3 × $10.00 with $1.00 off: returning 1 refunds $10.00 − $0.33.
        let line = item("a", 3, 0, 100);
        assert_eq!(refund_amount(&line, 1).cents(), 967);
        assert_eq!(refund_amount(&line, 3).cents(), 2900);
    }

    #[test]
    fn test_split_refunds_sum_to_the_net_line() {
        // 33 + 34 + 33 cents of the $1.00 discount.
        let mut line = item("a", 3, 0, 100);
        let mut refunds = Vec::new();
        for _ in 0..3 {
            refunds.push(plan_item_return(&line, 1).unwrap().amount.cents());
            line.returned_quantity += 1;
        }
        assert_eq!(refunds, vec![967, 966, 967]);
        assert_eq!(refunds.iter().sum::<i64>(), 2900);
    }

    #[test]
    fn test_full_return_after_partial_takes_the_remainder() {
        // One unit already refunded at 967; the rest must come to 1933.
        let line = item("a", 3, 1, 100);
        assert_eq!(refund_amount(&line, 2).cents(), 1933);
    }

    #[test]
    fn test_over_return_is_rejected() {
        let line = item("a", 2, 1, 0);
        assert_eq!(
            plan_item_return(&line, 2).unwrap_err(),
            CoreError::OverReturn {
                item: "Item a".into(),
                available: 1,
                requested: 2,
            }
        );
    }

    #[test]
    fn test_manual_item_return_has_no_restock() {
        let line = SaleItem {
            line: SaleLine::Manual,
            ..item("m", 1, 0, 0)
        };
        let plan = plan_item_return(&line, 1).unwrap();
        assert_eq!(plan.restock, None);
        assert_eq!(plan.amount.cents(), 1000);
    }

    #[test]
    fn test_derive_status() {
        assert_eq!(derive_status(&[item("a", 2, 0, 0)]), SaleStatus::Completed);
        assert_eq!(
            derive_status(&[item("a", 2, 1, 0)]),
            SaleStatus::PartiallyReturned
        );
        assert_eq!(
            derive_status(&[item("a", 2, 2, 0), item("b", 1, 0, 0)]),
            SaleStatus::PartiallyReturned
        );
        assert_eq!(
            derive_status(&[item("a", 2, 2, 0), item("b", 1, 1, 0)]),
            SaleStatus::Returned
        );
    }

    proptest! {
        /// Returning an item in several steps refunds exactly the one-shot
        /// amount.
        #[test]
        fn prop_split_returns_track_single_return(
            quantity in 1i64..50,
            discount in 0i64..1000,
            steps in proptest::collection::vec(1i64..10, 1..10),
        ) {
            let mut line = item("a", quantity, 0, discount);
            let whole = refund_amount(&line, quantity).cents();
            let mut refunded = 0i64;

            for step in steps {
                let take = step.min(line.returnable());
                if take == 0 {
                    break;
                }
                let plan = plan_item_return(&line, take).unwrap();
                refunded += plan.amount.cents();
                line.returned_quantity += take;
            }

            prop_assert!(line.returned_quantity <= line.quantity);
            if line.is_fully_returned() {
                prop_assert_eq!(refunded, whole);
            }
        }
    }
}
