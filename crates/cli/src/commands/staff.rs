//! Back-office commands.

use pedeai_client::models::{Coupon, NewCoupon};
use pedeai_client::services::StaffService;
use pedeai_core::{CouponId, DiscountType, Money, UserId};
use rust_decimal::Decimal;

use super::support::support_line;
use super::{CliError, Context, emit};

fn coupon_line(coupon: &Coupon) -> String {
    format!(
        "{}  {:<14} {:>9}  mín. {}  {}",
        coupon.id,
        coupon.code,
        coupon.value_label(),
        coupon.min_order_value,
        if coupon.active { "ativo" } else { "inativo" }
    )
}

/// List every store with its approval state.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn stores(ctx: &Context) -> Result<(), CliError> {
    ctx.sign_in().await?;
    for profile in StaffService::new(&ctx.backend).stores().await? {
        emit(format!(
            "{}  {:<28} {:<18} {}",
            profile.id,
            profile.full_name.as_deref().unwrap_or("-"),
            profile.cnpj.as_deref().unwrap_or("-"),
            profile.status.unwrap_or_default()
        ))?;
    }
    Ok(())
}

/// Approve or reject a store.
///
/// # Errors
///
/// Returns an error if the store does not exist.
pub async fn approve(ctx: &Context, store_id: UserId, approve: bool) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let staff = StaffService::new(&ctx.backend);
    let profile = if approve {
        staff.approve_store(store_id).await?
    } else {
        staff.reject_store(store_id).await?
    };
    emit(format!(
        "{}: {}",
        profile.full_name.as_deref().unwrap_or("-"),
        profile.status.unwrap_or_default()
    ))
}

/// List coupons.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn coupons(ctx: &Context) -> Result<(), CliError> {
    ctx.sign_in().await?;
    for coupon in StaffService::new(&ctx.backend).coupons().await? {
        emit(coupon_line(&coupon))?;
    }
    Ok(())
}

/// Create an active coupon.
///
/// # Errors
///
/// Returns an error for invalid values or a duplicate code.
pub async fn create_coupon(
    ctx: &Context,
    code: &str,
    discount_type: DiscountType,
    value: Decimal,
    min_order_value: Decimal,
) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let coupon = StaffService::new(&ctx.backend)
        .create_coupon(&NewCoupon::new(
            code,
            discount_type,
            value,
            Money::new(min_order_value),
        ))
        .await?;
    emit(coupon_line(&coupon))
}

/// Flip a coupon between active and inactive.
///
/// # Errors
///
/// Returns an error if the coupon does not exist.
pub async fn toggle_coupon(ctx: &Context, coupon_id: CouponId) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let coupon = StaffService::new(&ctx.backend).toggle_coupon(coupon_id).await?;
    emit(coupon_line(&coupon))
}

/// Delete a coupon.
///
/// # Errors
///
/// Returns an error if the coupon does not exist.
pub async fn delete_coupon(ctx: &Context, coupon_id: CouponId) -> Result<(), CliError> {
    ctx.sign_in().await?;
    StaffService::new(&ctx.backend).delete_coupon(coupon_id).await?;
    emit(format!("Cupom removido: {coupon_id}"))
}

/// Support conversations, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn inbox(ctx: &Context) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let conversations = StaffService::new(&ctx.backend).inbox().await?;
    if conversations.is_empty() {
        return emit("Nenhuma conversa");
    }
    for conversation in &conversations {
        let marker = if conversation.awaiting_staff() { "*" } else { " " };
        let last = conversation
            .last_message()
            .map(support_line)
            .unwrap_or_default();
        emit(format!("{marker} {}  {last}", conversation.user_id))?;
    }
    Ok(())
}

/// Answer a user's support conversation.
///
/// # Errors
///
/// Returns an error for blank text or a rejected insert.
pub async fn reply(ctx: &Context, user_id: UserId, text: &str) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let message = StaffService::new(&ctx.backend).reply(user_id, text).await?;
    emit(support_line(&message))
}
