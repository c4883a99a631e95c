//! Support conversations between users and staff.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pedeai_core::{SupportMessageId, SupportSender, UserId};
use serde::{Deserialize, Serialize};

/// A `support_messages` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportMessage {
    pub id: SupportMessageId,
    pub user_id: UserId,
    #[serde(default)]
    pub staff_id: Option<UserId>,
    pub text: String,
    pub sender_type: SupportSender,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewSupportMessage<'a> {
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<UserId>,
    pub text: &'a str,
    pub sender_type: SupportSender,
}

/// All support messages of one user, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportConversation {
    pub user_id: UserId,
    pub messages: Vec<SupportMessage>,
}

impl SupportConversation {
    /// The most recent message.
    #[must_use]
    pub fn last_message(&self) -> Option<&SupportMessage> {
        self.messages.last()
    }

    #[must_use]
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_message().map(|m| m.created_at)
    }

    /// Whether the user spoke last and is waiting on staff.
    #[must_use]
    pub fn awaiting_staff(&self) -> bool {
        self.last_message()
            .is_some_and(|m| m.sender_type == SupportSender::User)
    }
}

/// Group messages into one conversation per user, newest conversation first.
#[must_use]
pub fn group_conversations(messages: Vec<SupportMessage>) -> Vec<SupportConversation> {
    let mut by_user: HashMap<UserId, Vec<SupportMessage>> = HashMap::new();
    for message in messages {
        by_user.entry(message.user_id).or_default().push(message);
    }

    let mut conversations: Vec<SupportConversation> = by_user
        .into_iter()
        .map(|(user_id, mut messages)| {
            messages.sort_by_key(|m| m.created_at);
            SupportConversation { user_id, messages }
        })
        .collect();
    conversations.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
    conversations
}
