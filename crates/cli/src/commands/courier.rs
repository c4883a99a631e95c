//! Courier commands.

use futures::StreamExt;
use pedeai_client::backend::ChangeKind;
use pedeai_client::services::{ClaimOutcome, CourierService};
use pedeai_core::OrderId;

use super::{CliError, Context, emit, order_line};

/// List deliveries waiting for a courier.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn available(ctx: &Context) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let orders = CourierService::new(&ctx.backend).available().await?;
    if orders.is_empty() {
        return emit("Nenhuma entrega disponível");
    }
    for order in &orders {
        emit(format!("{}  ganho {}", order_line(order), order.courier_earnings()))?;
        emit(format!("    {}", order.address))?;
    }
    Ok(())
}

/// Claim a delivery for the signed-in courier.
///
/// # Errors
///
/// Returns an error if the courier already has a delivery in progress.
pub async fn claim(ctx: &Context, order_id: OrderId) -> Result<(), CliError> {
    ctx.sign_in().await?;
    match CourierService::new(&ctx.backend).claim_for_me(order_id).await? {
        ClaimOutcome::Claimed(order) => emit(format!("Entrega aceita! {}", order_line(&order))),
        ClaimOutcome::AlreadyClaimed => emit("Este pedido já foi aceito por outro entregador"),
    }
}

/// Confirm the order was collected at the store.
///
/// # Errors
///
/// Returns an error if the delivery is not in `accepted`.
pub async fn pickup(ctx: &Context, order_id: OrderId) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let order = CourierService::new(&ctx.backend)
        .confirm_collection(order_id)
        .await?;
    emit(order_line(&order))
}

/// Mark the delivery as done.
///
/// # Errors
///
/// Returns an error if the delivery is not in `shipping`.
pub async fn deliver(ctx: &Context, order_id: OrderId) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let order = CourierService::new(&ctx.backend).complete(order_id).await?;
    emit(format!("{}  ganho {}", order_line(&order), order.courier_earnings()))
}

/// Show the delivery in progress, if any.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn active(ctx: &Context) -> Result<(), CliError> {
    let courier_id = ctx.sign_in().await?;
    match CourierService::new(&ctx.backend)
        .active_delivery(courier_id)
        .await?
    {
        Some(order) => {
            emit(order_line(&order))?;
            emit(format!("    {}", order.address))
        }
        None => emit("Nenhuma entrega em andamento"),
    }
}

/// Total commission over delivered orders.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn earnings(ctx: &Context) -> Result<(), CliError> {
    let courier_id = ctx.sign_in().await?;
    let earnings = CourierService::new(&ctx.backend).earnings(courier_id).await?;
    emit(format!("{} entrega(s), {}", earnings.deliveries, earnings.total))
}

/// Delivered orders, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn history(ctx: &Context) -> Result<(), CliError> {
    let courier_id = ctx.sign_in().await?;
    let orders = CourierService::new(&ctx.backend).history(courier_id).await?;
    for order in &orders {
        emit(format!("{}  ganho {}", order_line(order), order.courier_earnings()))?;
    }
    Ok(())
}

/// Go online or offline.
///
/// # Errors
///
/// Returns an error if the profile update fails.
pub async fn set_online(ctx: &Context, is_online: bool) -> Result<(), CliError> {
    ctx.sign_in().await?;
    CourierService::new(&ctx.backend).set_online(is_online).await?;
    emit(if is_online { "Online" } else { "Offline" })
}

/// Report the courier's position.
///
/// # Errors
///
/// Returns an error for out-of-range coordinates.
pub async fn locate(ctx: &Context, latitude: f64, longitude: f64) -> Result<(), CliError> {
    ctx.sign_in().await?;
    CourierService::new(&ctx.backend)
        .update_location(latitude, longitude)
        .await?;
    emit(format!("Localização: {latitude:.5}, {longitude:.5}"))
}

/// Print deliveries as they become available.
///
/// # Errors
///
/// Returns an error if the subscription fails.
pub async fn watch_available(ctx: &Context) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let service = CourierService::new(&ctx.backend);
    for order in service.available().await? {
        emit(order_line(&order))?;
    }

    let mut events = std::pin::pin!(service.subscribe_available().await?);
    emit("Aguardando novas entregas...")?;
    while let Some(event) = events.next().await {
        let event = event?;
        if let Some(order) = event.record {
            let tag = match event.kind {
                ChangeKind::Insert => "nova",
                ChangeKind::Update => "pronta",
                ChangeKind::Delete => continue,
            };
            emit(format!("[{tag}] {}  ganho {}", order_line(&order), order.courier_earnings()))?;
        }
    }
    Ok(())
}
