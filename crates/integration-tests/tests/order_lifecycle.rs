//! Checkout and the store side of the order lifecycle.

use pedeai_client::ServiceError;
use pedeai_client::models::NewCoupon;
use pedeai_client::services::{
    CatalogService, CheckoutService, DashboardService, OrderService, StaffService,
};
use pedeai_core::{DiscountType, Money, OrderStatus, PaymentMethod, Role};
use pedeai_integration_tests::FakeBackend;
use pedeai_integration_tests::fixtures::{home_address, make_ready, place_order, store_with_product};
use rust_decimal::Decimal;

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_customer_orders_from_menu() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 2_500).await;
    let (customer, customer_id) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;

    let menu = CatalogService::new(&customer)
        .products(store.id)
        .await
        .expect("menu");
    assert_eq!(menu.len(), 1);

    let order = place_order(&customer, &store.product, 2, None).await;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.customer_id, customer_id);
    assert_eq!(order.store_id, store.id);
    assert_eq!(order.total, Money::from_cents(5_000));
    assert_eq!(order.item_count(), 2);
    assert_eq!(order.address, "Av. Paulista, 1578 - Bela Vista, Apto 42");
    assert_eq!(order.payment_method, Some(PaymentMethod::Pix));
    assert!(order.courier_id.is_none());

    let history = OrderService::new(&customer)
        .for_customer(customer_id)
        .await
        .expect("history");
    assert_eq!(history, vec![order]);
}

#[tokio::test]
async fn test_coupon_discount_applies_at_checkout() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 2_500).await;
    let (staff, _) = fake.signed_in("staff@pedeai.app", Role::Staff, "Suporte").await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;

    StaffService::new(&staff)
        .create_coupon(&NewCoupon::new(
            " bemvindo10 ",
            DiscountType::Percentage,
            Decimal::from(10),
            Money::from_cents(3_000),
        ))
        .await
        .expect("create coupon");

    let order = place_order(&customer, &store.product, 2, Some("BemVindo10")).await;
    assert_eq!(order.total, Money::from_cents(4_500));
    assert_eq!(order.coupon_code.as_deref(), Some("BEMVINDO10"));

    // One unit is below the R$ 30.00 minimum.
    let mut cart = pedeai_client::services::Cart::new();
    cart.add(store.product.clone()).expect("add");
    let err = CheckoutService::new(&customer)
        .place_order(&cart, &home_address(), PaymentMethod::Cash, Some("BEMVINDO10"))
        .await
        .expect_err("below minimum");
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = CheckoutService::new(&customer)
        .quote(&cart, Some("NAOEXISTE"))
        .await
        .expect_err("unknown coupon");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let fake = FakeBackend::start().await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;

    let err = CheckoutService::new(&customer)
        .place_order(
            &pedeai_client::services::Cart::new(),
            &home_address(),
            PaymentMethod::Pix,
            None,
        )
        .await
        .expect_err("empty cart");
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(fake.rows("orders").is_empty());
}

// =============================================================================
// Store transitions
// =============================================================================

#[tokio::test]
async fn test_store_moves_order_to_ready() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 3_290).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let order = place_order(&customer, &store.product, 1, None).await;

    let ready = make_ready(&store.backend, &order).await;
    assert_eq!(ready.status, OrderStatus::Ready);
    assert!(ready.is_claimable());

    let seen = OrderService::new(&customer).get(order.id).await.expect("get");
    assert_eq!(seen.status, OrderStatus::Ready);
}

#[tokio::test]
async fn test_stale_expected_status_conflicts() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 3_290).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let order = place_order(&customer, &store.product, 1, None).await;

    let orders = OrderService::new(&store.backend);
    orders
        .update_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
        .await
        .expect("confirm");

    // A second panel still showing the order as pending.
    let err = orders
        .update_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled)
        .await
        .expect_err("stale");
    assert!(matches!(err, ServiceError::Conflict(_)));

    let current = orders.get(order.id).await.expect("get");
    assert_eq!(current.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn test_store_cannot_skip_or_take_courier_steps() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 3_290).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let order = place_order(&customer, &store.product, 1, None).await;
    let orders = OrderService::new(&store.backend);

    let err = orders
        .advance(order.id, OrderStatus::Delivered)
        .await
        .expect_err("skip");
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    make_ready(&store.backend, &order).await;
    let err = orders
        .advance(order.id, OrderStatus::Accepted)
        .await
        .expect_err("courier step");
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn test_other_store_cannot_touch_order() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 3_290).await;
    let (intruder, _) = fake.signed_in("outra@pedeai.app", Role::Store, "Outra").await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let order = place_order(&customer, &store.product, 1, None).await;

    let err = OrderService::new(&intruder)
        .update_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled)
        .await
        .expect_err("not this store");
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_dashboard_counts_store_orders() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 2_000).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;

    let first = place_order(&customer, &store.product, 1, None).await;
    place_order(&customer, &store.product, 2, None).await;
    let cancelled = place_order(&customer, &store.product, 3, None).await;
    OrderService::new(&store.backend)
        .cancel(cancelled.id)
        .await
        .expect("cancel");
    make_ready(&store.backend, &first).await;

    let dashboard = DashboardService::new(&store.backend)
        .mine()
        .await
        .expect("dashboard");
    assert_eq!(dashboard.stats.revenue, Money::from_cents(6_000));
    assert_eq!(dashboard.stats.orders, 2);
    assert_eq!(dashboard.stats.cancelled, 1);
    assert_eq!(dashboard.stats.pending, 1);
    assert_eq!(dashboard.stats.average_ticket, Money::from_cents(3_000));
    assert_eq!(dashboard.board.active.len(), 2);
    assert_eq!(dashboard.board.history.len(), 1);
    assert_eq!(dashboard.board.pending_count(), 1);
}
