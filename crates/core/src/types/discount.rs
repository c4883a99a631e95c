//! Coupon discount arithmetic.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::price::Money;

/// How a coupon's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a percentage of the subtotal (e.g. `10` = 10%).
    #[default]
    Percentage,
    /// `value` is a fixed amount in reais.
    Fixed,
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" | "percent" | "%" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            _ => Err(format!("invalid discount type: {s}")),
        }
    }
}

/// Reasons a discount cannot be applied to a subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountError {
    #[error("coupon is not active")]
    Inactive,
    #[error("order must be at least {minimum} to use this coupon")]
    BelowMinimum { minimum: Money },
    #[error("invalid discount value: {0}")]
    InvalidValue(Decimal),
}

/// The economic terms of a coupon, independent of its storage row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_order_value: Money,
    pub active: bool,
}

impl Discount {
    /// Validate the discount value itself.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::InvalidValue`] for non-positive values or
    /// percentages above 100.
    pub fn validate(&self) -> Result<(), DiscountError> {
        let too_large =
            self.discount_type == DiscountType::Percentage && self.value > Decimal::ONE_HUNDRED;
        if self.value <= Decimal::ZERO || too_large {
            return Err(DiscountError::InvalidValue(self.value));
        }
        Ok(())
    }

    /// Amount taken off `subtotal`, never more than the subtotal itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the coupon is inactive, the subtotal is below the
    /// coupon minimum, or the value is invalid.
    pub fn amount_off(&self, subtotal: Money) -> Result<Money, DiscountError> {
        if !self.active {
            return Err(DiscountError::Inactive);
        }
        self.validate()?;
        if subtotal < self.min_order_value {
            return Err(DiscountError::BelowMinimum {
                minimum: self.min_order_value,
            });
        }

        let raw = match self.discount_type {
            DiscountType::Percentage => (subtotal * (self.value / Decimal::ONE_HUNDRED)).round_cents(),
            DiscountType::Fixed => Money::new(self.value),
        };
        Ok(raw.min(subtotal))
    }
}
