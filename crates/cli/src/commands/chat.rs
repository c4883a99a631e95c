//! Order chat between customer and store.

use futures::StreamExt;
use pedeai_client::models::OrderMessage;
use pedeai_client::services::{ChatEntry, ChatService, ChatThread};
use pedeai_core::{OrderId, UserId};

use super::{CliError, Context, emit};

fn message_line(message: &OrderMessage, viewer: UserId) -> String {
    let who = if message.is_mine(viewer) { "você" } else { "outro" };
    format!("[{}] {who}: {}", message.created_at.format("%H:%M"), message.text)
}

/// Send a message on an order.
///
/// # Errors
///
/// Returns an error for blank text or a rejected insert.
pub async fn send(ctx: &Context, order_id: OrderId, text: &str) -> Result<(), CliError> {
    let user_id = ctx.sign_in().await?;
    let message = ChatService::new(&ctx.backend).send(order_id, text).await?;
    emit(message_line(&message, user_id))
}

/// Print an order's chat, optionally following new messages.
///
/// # Errors
///
/// Returns an error if the messages or the subscription cannot be read.
pub async fn show(ctx: &Context, order_id: OrderId, follow: bool) -> Result<(), CliError> {
    let user_id = ctx.sign_in().await?;
    let service = ChatService::new(&ctx.backend);
    let mut thread = ChatThread::new(service.messages(order_id).await?);

    for entry in thread.entries() {
        if let ChatEntry::Confirmed(message) = entry {
            emit(message_line(message, user_id))?;
        }
    }
    if !follow {
        return Ok(());
    }

    let mut events = std::pin::pin!(service.subscribe(order_id).await?);
    while let Some(event) = events.next().await {
        if let Some(message) = event?.record {
            let line = message_line(&message, user_id);
            if thread.receive(message) {
                emit(line)?;
            }
        }
    }
    Ok(())
}
