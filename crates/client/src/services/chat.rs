//! Per-order chat between customer and store.
//!
//! Messages are rows in `order_messages` delivered to the other side through
//! the realtime feed. [`ChatThread`] holds what a screen shows: confirmed
//! rows plus messages sent locally that the server has not acknowledged yet.

use futures::Stream;
use pedeai_core::{OrderId, UserId};
use tracing::instrument;

use crate::backend::{Backend, BackendError, ChangeEvent, ChangeFilter, Direction, EventFilter, Query};
use crate::error::ServiceError;
use crate::models::OrderMessage;
use crate::models::message::NewOrderMessage;

use super::signed_in;

/// Order chat persistence and feed.
pub struct ChatService<'a> {
    backend: &'a Backend,
}

impl<'a> ChatService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// All messages of an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn messages(&self, order_id: OrderId) -> Result<Vec<OrderMessage>, ServiceError> {
        Ok(self
            .backend
            .select(
                &Query::table("order_messages")
                    .eq("order_id", order_id)
                    .order("created_at", Direction::Asc),
            )
            .await?)
    }

    /// Send a message as the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for blank text.
    #[instrument(skip(self, text))]
    pub async fn send(&self, order_id: OrderId, text: &str) -> Result<OrderMessage, ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::Validation("Mensagem vazia".to_string()));
        }
        let sender_id = signed_in(self.backend).await?;

        Ok(self
            .backend
            .insert(
                "order_messages",
                &NewOrderMessage {
                    order_id,
                    sender_id,
                    text,
                },
            )
            .await?)
    }

    /// New messages of an order as they are written.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be opened.
    pub async fn subscribe(
        &self,
        order_id: OrderId,
    ) -> Result<
        impl Stream<Item = Result<ChangeEvent<OrderMessage>, BackendError>> + Send + use<>,
        ServiceError,
    > {
        Ok(self
            .backend
            .subscribe(
                &format!("order_messages:{order_id}"),
                ChangeFilter::table("order_messages")
                    .event(EventFilter::Insert)
                    .eq("order_id", order_id),
            )
            .await?)
    }
}

/// Handle for a locally sent message awaiting acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(u64);

/// Delivery state of a locally sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    Sending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingMessage {
    local_id: LocalId,
    text: String,
    state: PendingState,
}

/// One line of a rendered chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEntry<'t> {
    Confirmed(&'t OrderMessage),
    Pending { text: &'t str, state: PendingState },
}

/// Messages of one order as a screen shows them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatThread {
    confirmed: Vec<OrderMessage>,
    pending: Vec<PendingMessage>,
    next_local: u64,
}

impl ChatThread {
    /// Start from messages already stored.
    #[must_use]
    pub fn new(mut messages: Vec<OrderMessage>) -> Self {
        messages.sort_by_key(|m| (m.created_at, m.id));
        messages.dedup_by_key(|m| m.id);
        Self {
            confirmed: messages,
            pending: Vec::new(),
            next_local: 0,
        }
    }

    /// Show a message right away, before the server confirms it.
    pub fn push_local(&mut self, text: impl Into<String>) -> LocalId {
        let local_id = LocalId(self.next_local);
        self.next_local += 1;
        self.pending.push(PendingMessage {
            local_id,
            text: text.into(),
            state: PendingState::Sending,
        });
        local_id
    }

    /// The server stored the message.
    pub fn acknowledge(&mut self, local_id: LocalId, message: OrderMessage) {
        self.pending.retain(|p| p.local_id != local_id);
        self.receive(message);
    }

    /// The send failed; keep the text so it can be retried.
    pub fn fail(&mut self, local_id: LocalId) {
        if let Some(pending) = self.pending.iter_mut().find(|p| p.local_id == local_id) {
            pending.state = PendingState::Failed;
        }
    }

    /// Drop a failed message, returning its text.
    pub fn discard(&mut self, local_id: LocalId) -> Option<String> {
        let index = self.pending.iter().position(|p| p.local_id == local_id)?;
        Some(self.pending.remove(index).text)
    }

    /// A message arrived from the feed or an acknowledgement.
    ///
    /// Returns `false` when the message was already known.
    pub fn receive(&mut self, message: OrderMessage) -> bool {
        if self.confirmed.iter().any(|m| m.id == message.id) {
            return false;
        }
        let at = self
            .confirmed
            .partition_point(|m| (m.created_at, m.id) <= (message.created_at, message.id));
        self.confirmed.insert(at, message);
        true
    }

    #[must_use]
    pub fn messages(&self) -> &[OrderMessage] {
        &self.confirmed
    }

    /// Confirmed messages in time order, then local ones in send order.
    pub fn entries(&self) -> impl Iterator<Item = ChatEntry<'_>> {
        self.confirmed
            .iter()
            .map(ChatEntry::Confirmed)
            .chain(self.pending.iter().map(|p| ChatEntry::Pending {
                text: &p.text,
                state: p.state,
            }))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.confirmed.len() + self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of messages written by someone other than `viewer`.
    #[must_use]
    pub fn from_others_count(&self, viewer: UserId) -> usize {
        self.confirmed.iter().filter(|m| !m.is_mine(viewer)).count()
    }
}
