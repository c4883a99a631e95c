//! A user's side of the support conversation.

use futures::Stream;
use pedeai_core::{SupportSender, UserId};
use tracing::instrument;

use crate::backend::{Backend, BackendError, ChangeEvent, ChangeFilter, Direction, EventFilter, Query};
use crate::error::ServiceError;
use crate::models::SupportMessage;
use crate::models::support::NewSupportMessage;

use super::signed_in;

pub struct SupportService<'a> {
    backend: &'a Backend,
}

impl<'a> SupportService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// The conversation of `user_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn messages(&self, user_id: UserId) -> Result<Vec<SupportMessage>, ServiceError> {
        Ok(self
            .backend
            .select(
                &Query::table("support_messages")
                    .eq("user_id", user_id)
                    .order("created_at", Direction::Asc),
            )
            .await?)
    }

    /// Write to support as the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for blank text.
    #[instrument(skip(self, text))]
    pub async fn send(&self, text: &str) -> Result<SupportMessage, ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::Validation("Mensagem vazia".to_string()));
        }
        let user_id = signed_in(self.backend).await?;

        Ok(self
            .backend
            .insert(
                "support_messages",
                &NewSupportMessage {
                    user_id,
                    staff_id: None,
                    text,
                    sender_type: SupportSender::User,
                },
            )
            .await?)
    }

    /// New messages in the conversation of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be opened.
    pub async fn subscribe(
        &self,
        user_id: UserId,
    ) -> Result<
        impl Stream<Item = Result<ChangeEvent<SupportMessage>, BackendError>> + Send + use<>,
        ServiceError,
    > {
        Ok(self
            .backend
            .subscribe(
                &format!("support_{user_id}"),
                ChangeFilter::table("support_messages")
                    .event(EventFilter::Insert)
                    .eq("user_id", user_id),
            )
            .await?)
    }
}
