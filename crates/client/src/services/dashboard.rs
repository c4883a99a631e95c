//! Store revenue dashboard, aggregated from the store's orders.

use pedeai_core::{Money, OrderStatus, UserId};
use rust_decimal::Decimal;

use crate::backend::Backend;
use crate::error::ServiceError;
use crate::models::Order;

use super::orders::{OrderBoard, OrderService};
use super::signed_in;

/// Headline numbers for a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    /// Sum of totals over non-cancelled orders.
    pub revenue: Money,
    /// Orders counted towards revenue.
    pub orders: usize,
    pub delivered: usize,
    pub cancelled: usize,
    pub pending: usize,
    pub average_ticket: Money,
}

impl DashboardStats {
    #[must_use]
    pub fn from_orders(orders: &[Order]) -> Self {
        let counted: Vec<&Order> = orders
            .iter()
            .filter(|order| order.status != OrderStatus::Cancelled)
            .collect();
        let revenue: Money = counted.iter().map(|order| order.total).sum();
        let average_ticket = if counted.is_empty() {
            Money::ZERO
        } else {
            Money::new(revenue.amount() / Decimal::from(counted.len())).round_cents()
        };
        let count = |status: OrderStatus| orders.iter().filter(|o| o.status == status).count();

        Self {
            revenue,
            orders: counted.len(),
            delivered: count(OrderStatus::Delivered),
            cancelled: count(OrderStatus::Cancelled),
            pending: count(OrderStatus::Pending),
            average_ticket,
        }
    }
}

/// Everything the store panel shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDashboard {
    pub stats: DashboardStats,
    pub board: OrderBoard,
}

pub struct DashboardService<'a> {
    backend: &'a Backend,
}

impl<'a> DashboardService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Dashboard for `store_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the orders cannot be fetched.
    pub async fn for_store(&self, store_id: UserId) -> Result<StoreDashboard, ServiceError> {
        let orders = OrderService::new(self.backend).for_store(store_id).await?;
        Ok(StoreDashboard {
            stats: DashboardStats::from_orders(&orders),
            board: OrderBoard::partition(orders),
        })
    }

    /// Dashboard for the signed-in store.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotSignedIn` without a session.
    pub async fn mine(&self) -> Result<StoreDashboard, ServiceError> {
        let store_id = signed_in(self.backend).await?;
        self.for_store(store_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pedeai_core::OrderId;

    use super::*;

    fn order(status: OrderStatus, cents: i64) -> Order {
        Order {
            id: OrderId::random(),
            customer_id: UserId::random(),
            store_id: UserId::random(),
            items: Vec::new(),
            status,
            total: Money::from_cents(cents),
            address: String::new(),
            courier_id: None,
            payment_method: None,
            coupon_code: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_revenue_excludes_cancelled() {
        let stats = DashboardStats::from_orders(&[
            order(OrderStatus::Delivered, 5_000),
            order(OrderStatus::Pending, 2_500),
            order(OrderStatus::Cancelled, 9_900),
            order(OrderStatus::Shipping, 1_000),
        ]);

        assert_eq!(stats.revenue, Money::from_cents(8_500));
        assert_eq!(stats.orders, 3);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.average_ticket, Money::from_cents(2_833));
    }

    #[test]
    fn test_empty_dashboard() {
        let stats = DashboardStats::from_orders(&[]);
        assert_eq!(stats.revenue, Money::ZERO);
        assert_eq!(stats.average_ticket, Money::ZERO);
    }
}
