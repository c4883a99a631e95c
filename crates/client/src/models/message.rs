//! Per-order chat messages.

use chrono::{DateTime, Utc};
use pedeai_core::{MessageId, MessageSender, OrderId, UserId};
use serde::{Deserialize, Serialize};

/// An `order_messages` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMessage {
    pub id: MessageId,
    pub order_id: OrderId,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl OrderMessage {
    /// Which side of the order wrote this message.
    #[must_use]
    pub fn sender(&self, customer_id: UserId) -> MessageSender {
        if self.sender_id == customer_id {
            MessageSender::User
        } else {
            MessageSender::Store
        }
    }

    /// Whether `viewer` wrote this message.
    #[must_use]
    pub fn is_mine(&self, viewer: UserId) -> bool {
        self.sender_id == viewer
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewOrderMessage<'a> {
    pub order_id: OrderId,
    pub sender_id: UserId,
    pub text: &'a str,
}
