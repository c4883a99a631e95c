//! Order reads, store-side status changes and order feeds.
//!
//! Every status write is a conditional update on the status the caller last
//! saw. If another screen moved the order in between, the update matches no
//! rows and the caller gets [`ServiceError::Conflict`] instead of silently
//! overwriting a newer state.

use futures::Stream;
use pedeai_core::{OrderId, OrderStatus, TransitionActor, UserId};
use tracing::instrument;

use crate::backend::{Backend, BackendError, ChangeEvent, ChangeFilter, Direction, Query};
use crate::error::ServiceError;
use crate::models::Order;
use crate::models::order::StatusPatch;

use super::signed_in;

/// Order queries and store-driven lifecycle changes.
pub struct OrderService<'a> {
    backend: &'a Backend,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist or is not
    /// visible to the signed-in user.
    #[instrument(skip(self))]
    pub async fn get(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        match self
            .backend
            .select_single(&Query::table("orders").eq("id", order_id))
            .await
        {
            Ok(order) => Ok(order),
            Err(BackendError::NotFound(_)) => Err(ServiceError::NotFound(format!("Pedido {order_id}"))),
            Err(e) => Err(e.into()),
        }
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn for_customer(&self, customer_id: UserId) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .backend
            .select(
                &Query::table("orders")
                    .eq("customer_id", customer_id)
                    .order("created_at", Direction::Desc),
            )
            .await?)
    }

    /// A store's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn for_store(&self, store_id: UserId) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .backend
            .select(
                &Query::table("orders")
                    .eq("store_id", store_id)
                    .order("created_at", Direction::Desc),
            )
            .await?)
    }

    /// Orders of the signed-in user, as customer.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotSignedIn` without a session.
    pub async fn mine(&self) -> Result<Vec<Order>, ServiceError> {
        let user_id = signed_in(self.backend).await?;
        self.for_customer(user_id).await
    }

    /// Move an order from `expected` to `to` on behalf of its store.
    ///
    /// # Errors
    ///
    /// - `ServiceError::InvalidTransition` if the lifecycle forbids the step.
    /// - `ServiceError::Forbidden` for courier-driven steps or when the
    ///   signed-in user is not the order's store.
    /// - `ServiceError::Conflict` if the order is no longer in `expected`.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, ServiceError> {
        expected.check_transition(to)?;
        if expected.transition_actor(to) != Some(TransitionActor::Store) {
            return Err(ServiceError::Forbidden(format!(
                "{expected} -> {to} is a courier step"
            )));
        }

        let store_id = signed_in(self.backend).await?;
        let query = Query::table("orders")
            .eq("id", order_id)
            .eq("store_id", store_id)
            .eq("status", expected);

        let updated: Vec<Order> = self.backend.update(&query, &StatusPatch { status: to }).await?;
        let order = updated.into_iter().next().ok_or_else(|| {
            ServiceError::Conflict(format!("Pedido {order_id} não está mais {}", expected.label()))
        })?;

        tracing::info!(order_id = %order_id, from = %expected, to = %to, "Order status updated");
        Ok(order)
    }

    /// Move an order to `to` from whatever status it has now.
    ///
    /// # Errors
    ///
    /// Same as [`Self::update_status`], plus `ServiceError::NotFound`.
    pub async fn advance(&self, order_id: OrderId, to: OrderStatus) -> Result<Order, ServiceError> {
        let current = self.get(order_id).await?;
        self.update_status(order_id, current.status, to).await
    }

    /// Cancel an order that has not been picked up.
    ///
    /// # Errors
    ///
    /// Same as [`Self::advance`].
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        self.advance(order_id, OrderStatus::Cancelled).await
    }

    /// Live changes to a store's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be opened.
    pub async fn subscribe_store(
        &self,
        store_id: UserId,
    ) -> Result<impl Stream<Item = Result<ChangeEvent<Order>, BackendError>> + Send + use<>, ServiceError>
    {
        Ok(self
            .backend
            .subscribe(
                &format!("store_orders:{store_id}"),
                ChangeFilter::table("orders").eq("store_id", store_id),
            )
            .await?)
    }

    /// Live changes to a customer's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be opened.
    pub async fn subscribe_customer(
        &self,
        customer_id: UserId,
    ) -> Result<impl Stream<Item = Result<ChangeEvent<Order>, BackendError>> + Send + use<>, ServiceError>
    {
        Ok(self
            .backend
            .subscribe(
                &format!("customer_orders:{customer_id}"),
                ChangeFilter::table("orders").eq("customer_id", customer_id),
            )
            .await?)
    }
}

/// Store order queue split into the kitchen view and the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBoard {
    /// `pending`, `confirmed` and `ready`.
    pub active: Vec<Order>,
    /// Everything past the kitchen, including cancellations.
    pub history: Vec<Order>,
}

impl OrderBoard {
    #[must_use]
    pub fn partition(orders: Vec<Order>) -> Self {
        let (active, history) = orders
            .into_iter()
            .partition(|order| order.status.is_store_active());
        Self { active, history }
    }

    /// Orders waiting for the store to accept them.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.active
            .iter()
            .filter(|order| order.status == OrderStatus::Pending)
            .count()
    }
}

/// Replace or insert `order` in a list kept newest-first.
pub fn apply_order_change(orders: &mut Vec<Order>, order: Order) {
    if let Some(existing) = orders.iter_mut().find(|o| o.id == order.id) {
        *existing = order;
    } else {
        orders.insert(0, order);
    }
}
