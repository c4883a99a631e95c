//! Discount coupons managed from the back office.

use chrono::{DateTime, Utc};
use pedeai_core::{CouponId, Discount, DiscountType, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A `coupons` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_order_value: Money,
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// The coupon's economic terms.
    #[must_use]
    pub const fn discount(&self) -> Discount {
        Discount {
            discount_type: self.discount_type,
            value: self.discount_value,
            min_order_value: self.min_order_value,
            active: self.active,
        }
    }

    /// Human-readable value, e.g. `10%` or `R$ 5.00`.
    #[must_use]
    pub fn value_label(&self) -> String {
        match self.discount_type {
            DiscountType::Percentage => format!("{}%", self.discount_value.normalize()),
            DiscountType::Fixed => Money::new(self.discount_value).to_string(),
        }
    }
}

/// A coupon to create. New coupons start active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_value: Money,
    pub active: bool,
}

impl NewCoupon {
    #[must_use]
    pub fn new(code: &str, discount_type: DiscountType, value: Decimal, min_order_value: Money) -> Self {
        Self {
            code: normalize_code(code),
            discount_type,
            discount_value: value,
            min_order_value,
            active: true,
        }
    }

    /// Terms of the coupon being created.
    #[must_use]
    pub const fn discount(&self) -> Discount {
        Discount {
            discount_type: self.discount_type,
            value: self.discount_value,
            min_order_value: self.min_order_value,
            active: self.active,
        }
    }
}

/// Coupon codes are stored trimmed and uppercase.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct CouponActive {
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_coupon_normalises_code() {
        let coupon = NewCoupon::new(
            "  bemvindo10 ",
            DiscountType::Percentage,
            Decimal::TEN,
            Money::from_cents(3_000),
        );
        assert_eq!(coupon.code, "BEMVINDO10");
        assert!(coupon.active);
        assert!(coupon.discount().validate().is_ok());
    }

    #[test]
    fn test_coupon_row_and_discount() {
        let coupon: Coupon = serde_json::from_value(serde_json::json!({
            "id": "1c9e6f0a-5b7d-4e3c-8a2f-9d0b1e2c3a4b",
            "code": "FRETE5",
            "discount_type": "fixed",
            "discount_value": 5,
            "min_order_value": 20,
            "active": true,
            "created_at": "2025-01-15T09:00:00+00:00"
        }))
        .expect("deserialize");

        assert_eq!(coupon.value_label(), "R$ 5.00");
        assert_eq!(
            coupon.discount().amount_off(Money::from_cents(2_500)),
            Ok(Money::from_cents(500))
        );
    }

    #[test]
    fn test_percentage_label() {
        let coupon = Coupon {
            id: CouponId::random(),
            code: "PIZZA15".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::new(1500, 2),
            min_order_value: Money::ZERO,
            active: false,
            created_at: None,
        };
        assert_eq!(coupon.value_label(), "15%");
    }
}
