//! # Money Module
//!
//! Integer-cent amounts for prices, labor and refunds.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A repair bill of 1.5h labor at $12.99/h:                               │
//! │    floats: 19.485000000000003                                           │
//! │    cents:  1299 × 150 / 100 = 1948.5 → 1949 (explicit half-up)          │
//! │                                                                         │
//! │  Refund of 1 of 3 units that shared a $1.00 discount:                  │
//! │    cents:  100 × 1 / 3 = 33.3 → 33                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stored amount is an `i64` number of cents; `Money` only exists so
//! the arithmetic can't silently mix cents with quantities or hours.
//!
//! ## Usage
//! ```rust
//! use velo_core::money::Money;
//!
//! let tube = Money::from_cents(899);
//! let labor = Money::from_cents(6000).multiply_hundredths(75);
//! assert_eq!((tube * 2 + labor).cents(), 6298);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

/// An amount in cents. Negative values are legal: a deposit larger than
/// the job cost leaves a negative balance.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Unit price × quantity.
    ///
    /// ```rust
    /// use velo_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, quantity: i64) -> Self {
        Money(self.0 * quantity)
    }

    /// Multiplies by a factor in hundredths (hours of labor are stored as
    /// hundredths of an hour), rounding half away from zero.
    ///
    /// ```rust
    /// use velo_core::money::Money;
    ///
    /// let rate = Money::from_cents(1299);
    /// assert_eq!(rate.multiply_hundredths(150).cents(), 1949);
    /// ```
    pub fn multiply_hundredths(&self, hundredths: i64) -> Money {
        self.prorate(hundredths, 100)
    }

    /// `self × numerator / denominator`, rounding half away from zero.
    /// A zero denominator yields zero.
    ///
    /// ```rust
    /// use velo_core::money::Money;
    ///
    /// // $1.00 discount on 3 units, 1 unit returned
    /// assert_eq!(Money::from_cents(100).prorate(1, 3).cents(), 33);
    /// ```
    pub fn prorate(&self, numerator: i64, denominator: i64) -> Money {
        if denominator == 0 {
            return Money::zero();
        }
        let value = i128::from(self.0) * i128::from(numerator);
        let divisor = i128::from(denominator);
        let half = divisor.abs() / 2;
        Money(((value + half * value.signum()) / divisor) as i64)
    }
}

/// `$12.34`, `-$5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, quantity: i64) -> Self {
        self.multiply_quantity(quantity)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-$0.05");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let mut running = a;
        running += b;
        assert_eq!(running.cents(), 1500);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_multiply_hundredths_rounds_half_up() {
        // 2h at $15.00
        assert_eq!(Money::from_cents(1500).multiply_hundredths(200).cents(), 3000);
        // 0.25h at $10.01 = 250.25 cents
        assert_eq!(Money::from_cents(1001).multiply_hundredths(25).cents(), 250);
        // 0.5h at $0.01 = 0.5 cents
        assert_eq!(Money::from_cents(1).multiply_hundredths(50).cents(), 1);
    }

    #[test]
    fn test_prorate() {
        assert_eq!(Money::from_cents(100).prorate(1, 3).cents(), 33);
        assert_eq!(Money::from_cents(100).prorate(2, 3).cents(), 67);
        assert_eq!(Money::from_cents(100).prorate(3, 3).cents(), 100);
        assert_eq!(Money::from_cents(100).prorate(1, 0).cents(), 0);
        assert_eq!(Money::from_cents(-100).prorate(2, 3).cents(), -67);
    }

    #[test]
    fn test_serializes_as_plain_cents() {
        assert_eq!(serde_json::to_string(&Money::from_cents(1299)).unwrap(), "1299");
    }
}
