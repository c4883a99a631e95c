//! Store commands: order queue, menu and dashboard.

use std::path::{Path, PathBuf};

use pedeai_client::models::{NewProduct, ProductUpdate};
use pedeai_client::services::{DashboardService, MenuService, OrderService, SuggestionService};
use pedeai_core::{Money, OrderId, OrderStatus, ProductId};
use rust_decimal::Decimal;

use super::{CliError, Context, emit, order_line};

/// Fields of `product add`.
pub struct ProductForm {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub image: Option<PathBuf>,
    /// Ask Gemini for a description when none is given.
    pub describe: bool,
}

/// Fields of `product update`; `None` leaves the column alone.
pub struct ProductEdit {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image: Option<PathBuf>,
}

/// Move one of the store's orders along.
///
/// # Errors
///
/// Returns an error for forbidden transitions or when the order changed
/// in the meantime.
pub async fn advance(ctx: &Context, order_id: OrderId, to: OrderStatus) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let order = OrderService::new(&ctx.backend).advance(order_id, to).await?;
    emit(order_line(&order))
}

async fn read_image(path: &Path) -> Result<(String, Vec<u8>), CliError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |name| name.to_string_lossy().into_owned());
    Ok((file_name, bytes))
}

async fn upload_product_image(ctx: &Context, path: &Path) -> Result<String, CliError> {
    let (file_name, bytes) = read_image(path).await?;
    let url = MenuService::new(&ctx.backend)
        .upload_product_image(&file_name, bytes)
        .await?;
    Ok(url.to_string())
}

/// Add a product to the signed-in store's menu.
///
/// # Errors
///
/// Returns an error if the image cannot be read or the insert fails.
pub async fn add_product(ctx: &Context, form: ProductForm) -> Result<(), CliError> {
    ctx.sign_in().await?;

    let description = match form.description {
        Some(description) => description,
        None if form.describe => {
            let gemini = ctx.gemini()?;
            SuggestionService::new(gemini.as_ref())
                .product_description(&form.name)
                .await
        }
        None => String::new(),
    };
    let image = match &form.image {
        Some(path) => upload_product_image(ctx, path).await?,
        None => String::new(),
    };

    let product = MenuService::new(&ctx.backend)
        .add_product(&NewProduct {
            name: form.name,
            description,
            price: Money::new(form.price),
            category: form.category,
            image,
        })
        .await?;
    emit(format!("Produto criado: {} {} {}", product.id, product.name, product.price))
}

/// Edit a product on the signed-in store's menu.
///
/// # Errors
///
/// Returns an error if nothing changes or the product is not on the menu.
pub async fn update_product(
    ctx: &Context,
    product_id: ProductId,
    edit: ProductEdit,
) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let image = match &edit.image {
        Some(path) => Some(upload_product_image(ctx, path).await?),
        None => None,
    };
    let product = MenuService::new(&ctx.backend)
        .update_product(
            product_id,
            &ProductUpdate {
                name: edit.name,
                description: edit.description,
                price: edit.price.map(Money::new),
                category: edit.category,
                image,
            },
        )
        .await?;
    emit(format!("Produto atualizado: {} {} {}", product.id, product.name, product.price))
}

/// Remove a product from the menu.
///
/// # Errors
///
/// Returns an error if the product is not on the menu.
pub async fn delete_product(ctx: &Context, product_id: ProductId) -> Result<(), CliError> {
    ctx.sign_in().await?;
    MenuService::new(&ctx.backend).delete_product(product_id).await?;
    emit(format!("Produto removido: {product_id}"))
}

/// Replace the store photo.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the upload fails.
pub async fn store_image(ctx: &Context, path: &Path) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let (file_name, bytes) = read_image(path).await?;
    let url = MenuService::new(&ctx.backend)
        .update_store_image(&file_name, bytes)
        .await?;
    emit(format!("Foto atualizada: {url}"))
}

/// Print the store panel: headline numbers and the order queue.
///
/// # Errors
///
/// Returns an error if the orders cannot be read.
pub async fn dashboard(ctx: &Context) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let dashboard = DashboardService::new(&ctx.backend).mine().await?;
    let stats = &dashboard.stats;

    emit(format!("Faturamento:  {}", stats.revenue))?;
    emit(format!("Pedidos:      {}", stats.orders))?;
    emit(format!("Entregues:    {}", stats.delivered))?;
    emit(format!("Cancelados:   {}", stats.cancelled))?;
    emit(format!("Ticket médio: {}", stats.average_ticket))?;

    emit(format!("\nEm andamento ({} novo(s))", dashboard.board.pending_count()))?;
    for order in &dashboard.board.active {
        emit(order_line(order))?;
    }
    emit("\nHistórico")?;
    for order in &dashboard.board.history {
        emit(order_line(order))?;
    }
    Ok(())
}
