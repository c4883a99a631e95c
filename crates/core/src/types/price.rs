//! Monetary amounts using decimal arithmetic.
//!
//! All prices in the marketplace are Brazilian reais. Amounts are carried as
//! [`Decimal`] so that order totals, coupon discounts and courier commissions
//! never accumulate floating-point drift.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Share of an order total paid to the courier who delivered it.
pub const COURIER_COMMISSION_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// An amount of money in BRL.
///
/// Serializes transparently as the inner decimal so it maps directly onto
/// `numeric` columns in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero reais.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal value.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from an integer number of centavos.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Round to whole centavos, half away from zero.
    #[must_use]
    pub fn round_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Whether the amount is strictly negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Subtract, flooring the result at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R$ {:.2}", self.round_cents().0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Courier earnings for delivering an order with the given total.
///
/// Flat [`COURIER_COMMISSION_RATE`] of the order total, rounded to centavos.
#[must_use]
pub fn courier_commission(total: Money) -> Money {
    (total * COURIER_COMMISSION_RATE).round_cents()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_rate_is_fifteen_percent() {
        assert_eq!(COURIER_COMMISSION_RATE.to_string(), "0.15");
    }

    #[test]
    fn test_courier_commission() {
        assert_eq!(courier_commission(Money::from_cents(10_000)), Money::from_cents(1_500));
        // 18.99 * 0.15 = 2.8485 -> 2.85
        assert_eq!(courier_commission(Money::from_cents(1_899)), Money::from_cents(285));
        assert_eq!(courier_commission(Money::ZERO), Money::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1_450).to_string(), "R$ 14.50");
        assert_eq!(Money::from_cents(7).to_string(), "R$ 0.07");
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let a = Money::from_cents(500);
        let b = Money::from_cents(900);
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a), Money::from_cents(400));
    }

    #[test]
    fn test_sum_and_mul() {
        let items = [Money::from_cents(1_899), Money::from_cents(650)];
        let total: Money = items.iter().sum();
        assert_eq!(total, Money::from_cents(2_549));
        assert_eq!(Money::from_cents(650) * 3, Money::from_cents(1_950));
    }

    #[test]
    fn test_deserializes_numbers_and_strings() {
        let from_number: Money = serde_json::from_str("42.5").expect("number");
        let from_string: Money = serde_json::from_str("\"42.50\"").expect("string");
        assert_eq!(from_number, from_string);
    }
}
