//! Orders, their denormalised item list and delivery addresses.

use chrono::{DateTime, Utc};
use pedeai_core::{Money, OrderId, OrderStatus, PaymentMethod, UserId, courier_commission};
use serde::{Deserialize, Serialize};

use super::product::Product;

/// One line of an order: a product snapshot and a quantity.
///
/// The product is copied into the order so later menu edits do not change
/// what the customer bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: Product,
    pub quantity: u32,
}

impl OrderItem {
    /// Price of the line.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.product.price * self.quantity
    }
}

/// An `orders` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub store_id: UserId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub total: Money,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub courier_id: Option<UserId>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of the item lines, before any coupon.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Ready and not yet claimed by a courier.
    #[must_use]
    pub const fn is_claimable(&self) -> bool {
        matches!(self.status, OrderStatus::Ready) && self.courier_id.is_none()
    }

    /// What the courier earns for delivering this order.
    #[must_use]
    pub fn courier_earnings(&self) -> Money {
        courier_commission(self.total)
    }

    /// Short reference shown to people, e.g. `#3F2A9C1B`.
    #[must_use]
    pub fn short_ref(&self) -> String {
        let id = self.id.to_string();
        let prefix: String = id.chars().take(8).collect();
        format!("#{}", prefix.to_uppercase())
    }
}

/// An order as inserted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub customer_id: UserId,
    pub store_id: UserId,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub total: Money,
    pub address: String,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// Patch moving an order to a new status.
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct StatusPatch {
    pub status: OrderStatus,
}

/// Patch attaching a courier while moving to `accepted`.
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct ClaimPatch {
    pub courier_id: UserId,
    pub status: OrderStatus,
}

/// Patch handing a claimed order back to the ready pool.
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct ReleasePatch {
    pub courier_id: Option<UserId>,
    pub status: OrderStatus,
}

impl ReleasePatch {
    pub const fn ready() -> Self {
        Self {
            courier_id: None,
            status: OrderStatus::Ready,
        }
    }
}

/// Kind of saved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Home,
    Work,
    #[default]
    Other,
}

/// A customer's saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// e.g. "Casa", "Trabalho"
    pub label: String,
    /// Street, number and district.
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: AddressKind,
}

impl Address {
    /// The single-line form stored on the order: `details, complement`.
    #[must_use]
    pub fn delivery_line(&self) -> String {
        let details = self.details.trim();
        match self.complement.as_deref().map(str::trim) {
            Some(complement) if !complement.is_empty() => format!("{details}, {complement}"),
            _ => details.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pedeai_core::ProductId;

    use super::*;

    fn product(cents: i64) -> Product {
        Product {
            id: ProductId::random(),
            store_id: UserId::random(),
            name: "X-Salada".to_string(),
            description: String::new(),
            price: Money::from_cents(cents),
            category: "Hambúrgueres".to_string(),
            image: String::new(),
            created_at: None,
        }
    }

    fn order(status: OrderStatus, courier_id: Option<UserId>) -> Order {
        Order {
            id: OrderId::random(),
            customer_id: UserId::random(),
            store_id: UserId::random(),
            items: vec![
                OrderItem {
                    product: product(2_490),
                    quantity: 2,
                },
                OrderItem {
                    product: product(800),
                    quantity: 1,
                },
            ],
            status,
            total: Money::from_cents(5_780),
            address: "Rua Augusta, 500".to_string(),
            courier_id,
            payment_method: Some(PaymentMethod::Pix),
            coupon_code: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_subtotal_and_count() {
        let order = order(OrderStatus::Pending, None);
        assert_eq!(order.subtotal(), Money::from_cents(5_780));
        assert_eq!(order.item_count(), 3);
    }

    #[test]
    fn test_is_claimable() {
        assert!(order(OrderStatus::Ready, None).is_claimable());
        assert!(!order(OrderStatus::Ready, Some(UserId::random())).is_claimable());
        assert!(!order(OrderStatus::Confirmed, None).is_claimable());
    }

    #[test]
    fn test_courier_earnings() {
        // 57.80 * 0.15 = 8.67
        assert_eq!(
            order(OrderStatus::Delivered, None).courier_earnings(),
            Money::from_cents(867)
        );
    }

    #[test]
    fn test_short_ref() {
        let mut order = order(OrderStatus::Pending, None);
        order.id = "3f2a9c1b-0000-4000-8000-000000000000".parse().expect("uuid");
        assert_eq!(order.short_ref(), "#3F2A9C1B");
    }

    #[test]
    fn test_order_row_deserialization() {
        let json = serde_json::json!({
            "id": "6f1c2a8e-0d4b-4a51-9b8f-3e2d1c0b9a87",
            "customer_id": "5f0c6a3e-4f8e-4d7b-9a0e-0d3c1b2a9f11",
            "store_id": "9a1f1d4e-2a51-4c1e-8d8e-5b8f7f0c6d21",
            "items": [],
            "status": "ready",
            "total": 45.9,
            "address": "Av. Paulista, 1578",
            "courier_id": null,
            "created_at": "2025-03-01T12:00:00.000000+00:00"
        });
        let order: Order = serde_json::from_value(json).expect("deserialize");
        assert_eq!(order.status, OrderStatus::Ready);
        assert_eq!(order.total, Money::from_cents(4_590));
        assert!(order.payment_method.is_none());
        assert!(order.is_claimable());
    }

    #[test]
    fn test_release_patch_clears_courier() {
        assert_eq!(
            serde_json::to_value(ReleasePatch::ready()).expect("serialize"),
            serde_json::json!({"courier_id": null, "status": "ready"})
        );
    }

    #[test]
    fn test_address_delivery_line() {
        let mut address = Address {
            label: "Casa".to_string(),
            details: "Av. Paulista, 1578 - Bela Vista".to_string(),
            complement: Some("Apto 42".to_string()),
            kind: AddressKind::Home,
        };
        assert_eq!(address.delivery_line(), "Av. Paulista, 1578 - Bela Vista, Apto 42");

        address.complement = Some("  ".to_string());
        assert_eq!(address.delivery_line(), "Av. Paulista, 1578 - Bela Vista");
    }

    #[test]
    fn test_address_kind_serializes_as_type() {
        let address: Address = serde_json::from_value(serde_json::json!({
            "label": "Trabalho",
            "details": "Rua Funchal, 418",
            "type": "work"
        }))
        .expect("deserialize");
        assert_eq!(address.kind, AddressKind::Work);
        assert!(address.complement.is_none());
    }
}
