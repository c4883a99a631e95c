//! Customer commands: catalog, checkout and order tracking.

use futures::StreamExt;
use pedeai_client::models::{Address, AddressKind, Order};
use pedeai_client::services::{
    Cart, CatalogService, CheckoutService, OrderService, SessionService, apply_order_change,
};
use pedeai_core::{PaymentMethod, ProductId, Role, UserId};

use super::{CliError, Context, emit, order_line};

/// List stores matching a category and a name search.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn stores(ctx: &Context, category: &str, search: &str) -> Result<(), CliError> {
    let stores = CatalogService::new(&ctx.backend)
        .search_stores(category, search)
        .await?;
    if stores.is_empty() {
        return emit("Nenhuma loja encontrada");
    }
    for store in stores {
        emit(format!(
            "{}  {:<28} {:<14} ★ {}  {}",
            store.id, store.name, store.category, store.rating, store.delivery_time
        ))?;
    }
    Ok(())
}

/// Print a store's menu.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn menu(ctx: &Context, store: UserId) -> Result<(), CliError> {
    let products = CatalogService::new(&ctx.backend).products(store).await?;
    if products.is_empty() {
        return emit("Cardápio vazio");
    }
    for product in products {
        emit(format!("{}  {:<32} {}", product.id, product.name, product.price))?;
        if !product.description.is_empty() {
            emit(format!("    {}", product.description))?;
        }
    }
    Ok(())
}

/// List orders of the signed-in user, from the store side for stores.
///
/// # Errors
///
/// Returns an error if sign-in or the query fails.
pub async fn orders(ctx: &Context) -> Result<(), CliError> {
    let user_id = ctx.sign_in().await?;
    let orders = fetch_orders(ctx, user_id).await?;
    if orders.is_empty() {
        return emit("Nenhum pedido");
    }
    for order in &orders {
        emit(order_line(order))?;
    }
    Ok(())
}

async fn is_store(ctx: &Context, user_id: UserId) -> Result<bool, CliError> {
    let profile = SessionService::new(&ctx.backend).profile(user_id).await?;
    Ok(profile.is_some_and(|p| p.role == Role::Store))
}

async fn fetch_orders(ctx: &Context, user_id: UserId) -> Result<Vec<Order>, CliError> {
    let service = OrderService::new(&ctx.backend);
    if is_store(ctx, user_id).await? {
        Ok(service.for_store(user_id).await?)
    } else {
        Ok(service.for_customer(user_id).await?)
    }
}

/// Print one order with its items.
///
/// # Errors
///
/// Returns an error if the order cannot be read.
pub async fn show_order(ctx: &Context, order_id: pedeai_core::OrderId) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let order = OrderService::new(&ctx.backend).get(order_id).await?;
    emit(order_line(&order))?;
    emit(format!("Endereço: {}", order.address))?;
    for item in &order.items {
        emit(format!(
            "  {}x {:<30} {}",
            item.quantity,
            item.product.name,
            item.line_total()
        ))?;
    }
    if let Some(code) = &order.coupon_code {
        emit(format!("Cupom: {code}"))?;
    }
    Ok(())
}

/// Build a cart from product ids and place it.
///
/// # Errors
///
/// Returns an error for unknown products, invalid coupons or a failed insert.
pub async fn place_order(
    ctx: &Context,
    store: UserId,
    items: &[ProductId],
    address: &str,
    complement: Option<&str>,
    payment: PaymentMethod,
    coupon: Option<&str>,
) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let menu = CatalogService::new(&ctx.backend).products(store).await?;

    let mut cart = Cart::new();
    for id in items {
        let product = menu.iter().find(|p| p.id == *id).ok_or_else(|| {
            pedeai_client::ServiceError::NotFound(format!("Produto {id} nesta loja"))
        })?;
        cart.add(product.clone())?;
    }

    let address = Address {
        label: "Outro".to_string(),
        details: address.to_string(),
        complement: complement.map(str::to_string),
        kind: AddressKind::Other,
    };
    let checkout = CheckoutService::new(&ctx.backend);
    let quote = checkout.quote(&cart, coupon).await?;
    emit(format!("Subtotal: {}", quote.subtotal))?;
    if quote.discount > pedeai_core::Money::ZERO {
        emit(format!("Desconto: -{}", quote.discount))?;
    }

    let order = checkout.place_order(&cart, &address, payment, coupon).await?;
    emit(format!("Pedido realizado! {}", order_line(&order)))
}

/// Print live order changes until interrupted.
///
/// # Errors
///
/// Returns an error if the subscription fails.
pub async fn watch_orders(ctx: &Context) -> Result<(), CliError> {
    let user_id = ctx.sign_in().await?;
    let service = OrderService::new(&ctx.backend);
    let mut orders = fetch_orders(ctx, user_id).await?;

    let mut events = if is_store(ctx, user_id).await? {
        service.subscribe_store(user_id).await?.boxed()
    } else {
        service.subscribe_customer(user_id).await?.boxed()
    };
    emit(format!("Acompanhando {} pedido(s)...", orders.len()))?;

    while let Some(event) = events.next().await {
        let event = event?;
        if let Some(order) = event.record {
            emit(format!("{:?} {}", event.kind, order_line(&order)))?;
            apply_order_change(&mut orders, order);
        }
    }
    Ok(())
}
