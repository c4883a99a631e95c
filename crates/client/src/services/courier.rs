//! Courier operations: availability, claiming and delivering orders.
//!
//! Claiming is a conditional update on `status = ready AND courier_id IS
//! NULL`. The backend applies it atomically, so of several couriers racing
//! for one order exactly one update matches a row.
//!
//! A courier holds at most one accepted or shipping order. Claims through one
//! client are serialized; a claim that still ends up next to another active
//! delivery (the same account on a second device) is released again.

use futures::{Stream, StreamExt, future};
use pedeai_core::{Money, OrderId, OrderStatus, UserId};
use tracing::instrument;

use crate::backend::{Backend, BackendError, ChangeEvent, ChangeFilter, Direction, Query};
use crate::error::ServiceError;
use crate::models::order::{ClaimPatch, ReleasePatch, StatusPatch};
use crate::models::{CourierAvailability, CourierLocation, Order};

use super::signed_in;

/// Result of trying to claim a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The courier now owns the delivery.
    Claimed(Order),
    /// Another courier got there first, or the order left `ready`.
    AlreadyClaimed,
}

/// Delivered-order totals for a courier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Earnings {
    pub deliveries: usize,
    pub total: Money,
}

impl Earnings {
    /// Sum the commission over delivered orders.
    #[must_use]
    pub fn from_history(orders: &[Order]) -> Self {
        let delivered = orders
            .iter()
            .filter(|order| order.status == OrderStatus::Delivered);
        Self {
            deliveries: delivered.clone().count(),
            total: delivered.map(Order::courier_earnings).sum(),
        }
    }
}

/// Operations for the signed-in courier.
pub struct CourierService<'a> {
    backend: &'a Backend,
}

impl<'a> CourierService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Ready orders nobody has claimed, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn available(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .backend
            .select(
                &Query::table("orders")
                    .eq("status", OrderStatus::Ready)
                    .is_null("courier_id")
                    .order("created_at", Direction::Asc),
            )
            .await?)
    }

    /// Claim a ready order for `courier_id`.
    ///
    /// Refused unless `courier_id` is the signed-in user and that courier has
    /// no delivery in progress.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotSignedIn` without a session.
    /// - `ServiceError::Forbidden` when claiming for someone else.
    /// - `ServiceError::Conflict` while another delivery is active.
    #[instrument(skip(self))]
    pub async fn claim(&self, order_id: OrderId, courier_id: UserId) -> Result<ClaimOutcome, ServiceError> {
        let user_id = signed_in(self.backend).await?;
        if user_id != courier_id {
            tracing::warn!(%user_id, %courier_id, "Claim attempted for another courier");
            return Err(ServiceError::Forbidden(
                "Só é possível aceitar entregas para você mesmo".to_string(),
            ));
        }

        let _guard = self.backend.claim_guard().await;

        if let Some(active) = self.active_delivery(courier_id).await? {
            return Err(busy(&active));
        }

        let query = Query::table("orders")
            .eq("id", order_id)
            .eq("status", OrderStatus::Ready)
            .is_null("courier_id");
        let patch = ClaimPatch {
            courier_id,
            status: OrderStatus::Accepted,
        };

        let updated: Vec<Order> = self.backend.update(&query, &patch).await?;
        let Some(order) = updated.into_iter().next() else {
            tracing::info!(order_id = %order_id, "Delivery already claimed");
            return Ok(ClaimOutcome::AlreadyClaimed);
        };

        if let Some(other) = self.other_active_delivery(courier_id, order_id).await? {
            self.release(order_id, courier_id).await?;
            tracing::warn!(
                order_id = %order_id,
                other = %other.id,
                "Released claim made alongside another delivery"
            );
            return Err(busy(&other));
        }

        tracing::info!(order_id = %order_id, "Delivery claimed");
        Ok(ClaimOutcome::Claimed(order))
    }

    async fn other_active_delivery(
        &self,
        courier_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, ServiceError> {
        Ok(self
            .backend
            .select_first(
                &Query::table("orders")
                    .eq("courier_id", courier_id)
                    .neq("id", order_id)
                    .in_list("status", [OrderStatus::Accepted, OrderStatus::Shipping])
                    .order("created_at", Direction::Asc),
            )
            .await?)
    }

    /// Undo a claim that has not been picked up yet.
    async fn release(&self, order_id: OrderId, courier_id: UserId) -> Result<(), ServiceError> {
        let query = Query::table("orders")
            .eq("id", order_id)
            .eq("courier_id", courier_id)
            .eq("status", OrderStatus::Accepted);
        let _: Vec<Order> = self.backend.update(&query, &ReleasePatch::ready()).await?;
        Ok(())
    }

    /// Claim for the signed-in courier.
    ///
    /// # Errors
    ///
    /// Same as [`Self::claim`].
    pub async fn claim_for_me(&self, order_id: OrderId) -> Result<ClaimOutcome, ServiceError> {
        let courier_id = signed_in(self.backend).await?;
        self.claim(order_id, courier_id).await
    }

    /// The order has been picked up at the store (`accepted -> shipping`).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if the order is not an accepted
    /// delivery of this courier.
    pub async fn confirm_collection(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        self.step(order_id, OrderStatus::Accepted, OrderStatus::Shipping)
            .await
    }

    /// The order has been handed over (`shipping -> delivered`).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if the order is not a shipping
    /// delivery of this courier.
    pub async fn complete(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        self.step(order_id, OrderStatus::Shipping, OrderStatus::Delivered)
            .await
    }

    #[instrument(skip(self))]
    async fn step(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, ServiceError> {
        from.check_transition(to)?;
        let courier_id = signed_in(self.backend).await?;
        let query = Query::table("orders")
            .eq("id", order_id)
            .eq("courier_id", courier_id)
            .eq("status", from);

        let updated: Vec<Order> = self.backend.update(&query, &StatusPatch { status: to }).await?;
        let order = updated.into_iter().next().ok_or_else(|| {
            ServiceError::Conflict(format!("Entrega {order_id} não está {}", from.label()))
        })?;

        tracing::info!(order_id = %order_id, from = %from, to = %to, "Delivery progressed");
        Ok(order)
    }

    /// The courier's delivery in progress, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn active_delivery(&self, courier_id: UserId) -> Result<Option<Order>, ServiceError> {
        Ok(self
            .backend
            .select_first(
                &Query::table("orders")
                    .eq("courier_id", courier_id)
                    .in_list("status", [OrderStatus::Accepted, OrderStatus::Shipping])
                    .order("created_at", Direction::Desc),
            )
            .await?)
    }

    /// Delivered orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn history(&self, courier_id: UserId) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .backend
            .select(
                &Query::table("orders")
                    .eq("courier_id", courier_id)
                    .eq("status", OrderStatus::Delivered)
                    .order("created_at", Direction::Desc),
            )
            .await?)
    }

    /// Commission earned over the delivery history.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn earnings(&self, courier_id: UserId) -> Result<Earnings, ServiceError> {
        Ok(Earnings::from_history(&self.history(courier_id).await?))
    }

    /// Go online or offline.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    #[instrument(skip(self))]
    pub async fn set_online(&self, is_online: bool) -> Result<(), ServiceError> {
        let courier_id = signed_in(self.backend).await?;
        let _: Vec<serde_json::Value> = self
            .backend
            .update(
                &Query::table("profiles").eq("id", courier_id),
                &CourierAvailability { is_online },
            )
            .await?;
        Ok(())
    }

    /// Report the courier's position.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for out-of-range coordinates.
    #[instrument(skip(self))]
    pub async fn update_location(&self, latitude: f64, longitude: f64) -> Result<(), ServiceError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ServiceError::Validation(format!(
                "Coordenadas inválidas: {latitude}, {longitude}"
            )));
        }
        let courier_id = signed_in(self.backend).await?;
        let _: Vec<serde_json::Value> = self
            .backend
            .update(
                &Query::table("profiles").eq("id", courier_id),
                &CourierLocation {
                    latitude,
                    longitude,
                },
            )
            .await?;
        Ok(())
    }

    /// Live feed of claimable orders.
    ///
    /// Changes to ready orders that already carry a courier are dropped;
    /// deletes are passed through so the list can forget them.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be opened.
    pub async fn subscribe_available(
        &self,
    ) -> Result<impl Stream<Item = Result<ChangeEvent<Order>, BackendError>> + Send + use<>, ServiceError>
    {
        let events = self
            .backend
            .subscribe::<Order>(
                "available-deliveries",
                ChangeFilter::table("orders").eq("status", OrderStatus::Ready),
            )
            .await?;
        Ok(events.filter(|item| future::ready(is_claimable_change(item))))
    }
}

fn busy(active: &Order) -> ServiceError {
    ServiceError::Conflict(format!(
        "Finalize a entrega {} antes de aceitar outra",
        active.short_ref()
    ))
}

fn is_claimable_change(item: &Result<ChangeEvent<Order>, BackendError>) -> bool {
    match item {
        Ok(event) => event.record.as_ref().is_none_or(Order::is_claimable),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::backend::ChangeKind;

    fn order(status: OrderStatus, total_cents: i64, courier_id: Option<UserId>) -> Order {
        Order {
            id: OrderId::random(),
            customer_id: UserId::random(),
            store_id: UserId::random(),
            items: Vec::new(),
            status,
            total: Money::from_cents(total_cents),
            address: "Rua Haddock Lobo, 1200".to_string(),
            courier_id,
            payment_method: None,
            coupon_code: None,
            created_at: Utc::now(),
        }
    }

    fn change(kind: ChangeKind, record: Option<Order>) -> Result<ChangeEvent<Order>, BackendError> {
        Ok(ChangeEvent {
            kind,
            schema: "public".to_string(),
            table: "orders".to_string(),
            commit_timestamp: None,
            record,
            old_record: Some(serde_json::json!({"id": OrderId::random()})),
        })
    }

    #[test]
    fn test_earnings_sum_delivered_commission() {
        let history = vec![
            order(OrderStatus::Delivered, 10_000, None),
            order(OrderStatus::Delivered, 4_590, None),
            order(OrderStatus::Shipping, 9_990, None),
        ];
        let earnings = Earnings::from_history(&history);
        // 15.00 + 6.885 -> 6.89
        assert_eq!(earnings.deliveries, 2);
        assert_eq!(earnings.total, Money::from_cents(2_189));
    }

    #[test]
    fn test_empty_history_earns_nothing() {
        assert_eq!(Earnings::from_history(&[]), Earnings::default());
    }

    #[test]
    fn test_available_feed_filter() {
        assert!(is_claimable_change(&change(
            ChangeKind::Insert,
            Some(order(OrderStatus::Ready, 1_000, None))
        )));
        assert!(!is_claimable_change(&change(
            ChangeKind::Update,
            Some(order(OrderStatus::Ready, 1_000, Some(UserId::random())))
        )));
        assert!(is_claimable_change(&change(ChangeKind::Delete, None)));
        assert!(is_claimable_change(&Err(BackendError::Realtime(
            "closed".to_string()
        ))));
    }
}
