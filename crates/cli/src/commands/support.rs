//! Support chat from the user side.

use futures::StreamExt;
use pedeai_client::models::SupportMessage;
use pedeai_client::services::SupportService;
use pedeai_core::SupportSender;

use super::{CliError, Context, emit};

pub(crate) fn support_line(message: &SupportMessage) -> String {
    let who = match message.sender_type {
        SupportSender::User => "usuário",
        SupportSender::Staff => "suporte",
    };
    format!(
        "[{}] {who}: {}",
        message.created_at.format("%d/%m %H:%M"),
        message.text
    )
}

/// Write to the support team.
///
/// # Errors
///
/// Returns an error for blank text or a rejected insert.
pub async fn send(ctx: &Context, text: &str) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let message = SupportService::new(&ctx.backend).send(text).await?;
    emit(support_line(&message))
}

/// Print the conversation and follow replies.
///
/// # Errors
///
/// Returns an error if the messages or the subscription cannot be read.
pub async fn show(ctx: &Context) -> Result<(), CliError> {
    let user_id = ctx.sign_in().await?;
    let service = SupportService::new(&ctx.backend);
    let history = service.messages(user_id).await?;
    if history.is_empty() {
        emit("Olá! Como podemos ajudar?")?;
    }
    for message in &history {
        emit(support_line(message))?;
    }

    let mut events = std::pin::pin!(service.subscribe(user_id).await?);
    while let Some(event) = events.next().await {
        if let Some(message) = event?.record
            && !history.iter().any(|seen| seen.id == message.id)
        {
            emit(support_line(&message))?;
        }
    }
    Ok(())
}
