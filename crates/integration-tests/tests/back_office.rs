//! Store approval, coupons, menu editing and support chat.

use pedeai_client::ServiceError;
use pedeai_client::models::{NewCoupon, ProductUpdate};
use pedeai_client::services::{CatalogService, MenuService, StaffService, SupportService};
use pedeai_core::{DiscountType, Money, Role, StoreStatus, SupportSender};
use pedeai_integration_tests::FakeBackend;
use pedeai_integration_tests::fixtures::store_with_product;
use rust_decimal::Decimal;

// =============================================================================
// Store approval
// =============================================================================

#[tokio::test]
async fn test_rejected_stores_leave_the_catalog() {
    let fake = FakeBackend::start().await;
    let (_, store_id) = fake.signed_in("loja@pedeai.app", Role::Store, "Sushi Kazu").await;
    let (staff, _) = fake.signed_in("staff@pedeai.app", Role::Staff, "Suporte").await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let catalog = CatalogService::new(&customer);

    let stores = catalog.stores().await.expect("stores");
    assert_eq!(stores.len(), 1);
    assert_eq!(stores.first().map(|s| s.status), Some(StoreStatus::Pending));

    let rejected = StaffService::new(&staff)
        .reject_store(store_id)
        .await
        .expect("reject");
    assert_eq!(rejected.status, Some(StoreStatus::Rejected));
    assert!(catalog.stores().await.expect("stores").is_empty());

    StaffService::new(&staff)
        .approve_store(store_id)
        .await
        .expect("approve");
    let stores = catalog
        .search_stores("Todos", "kazu")
        .await
        .expect("search");
    assert_eq!(stores.len(), 1);
    assert_eq!(stores.first().map(|s| s.status), Some(StoreStatus::Approved));
}

#[tokio::test]
async fn test_approving_a_non_store_is_not_found() {
    let fake = FakeBackend::start().await;
    let (_, customer_id) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let (staff, _) = fake.signed_in("staff@pedeai.app", Role::Staff, "Suporte").await;

    let err = StaffService::new(&staff)
        .approve_store(customer_id)
        .await
        .expect_err("not a store");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

// =============================================================================
// Coupons
// =============================================================================

#[tokio::test]
async fn test_coupon_management() {
    let fake = FakeBackend::start().await;
    let (staff, _) = fake.signed_in("staff@pedeai.app", Role::Staff, "Suporte").await;
    let service = StaffService::new(&staff);
    let coupon = NewCoupon::new("frete5", DiscountType::Fixed, Decimal::from(5), Money::ZERO);

    let created = service.create_coupon(&coupon).await.expect("create");
    assert_eq!(created.code, "FRETE5");
    assert!(created.active);

    let err = service.create_coupon(&coupon).await.expect_err("duplicate");
    assert!(matches!(err, ServiceError::Conflict(_)));

    let toggled = service.toggle_coupon(created.id).await.expect("toggle");
    assert!(!toggled.active);

    service.delete_coupon(created.id).await.expect("delete");
    assert!(service.coupons().await.expect("coupons").is_empty());
    let err = service.delete_coupon(created.id).await.expect_err("gone");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_invalid_coupon_values_are_rejected() {
    let fake = FakeBackend::start().await;
    let (staff, _) = fake.signed_in("staff@pedeai.app", Role::Staff, "Suporte").await;
    let service = StaffService::new(&staff);

    let too_much = NewCoupon::new("TUDO", DiscountType::Percentage, Decimal::from(150), Money::ZERO);
    let err = service.create_coupon(&too_much).await.expect_err("over 100%");
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(fake.rows("coupons").is_empty());
}

// =============================================================================
// Menu
// =============================================================================

#[tokio::test]
async fn test_menu_edit_and_delete() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 2_990).await;
    let menu = MenuService::new(&store.backend);

    let updated = menu
        .update_product(
            store.product.id,
            &ProductUpdate {
                price: Some(Money::from_cents(3_490)),
                ..ProductUpdate::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.price, Money::from_cents(3_490));
    assert_eq!(updated.name, store.product.name);

    let err = menu
        .update_product(store.product.id, &ProductUpdate::default())
        .await
        .expect_err("empty update");
    assert!(matches!(err, ServiceError::Validation(_)));

    menu.delete_product(store.product.id).await.expect("delete");
    let err = menu
        .delete_product(store.product.id)
        .await
        .expect_err("already deleted");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_other_store_cannot_edit_menu() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 2_990).await;
    let (intruder, _) = fake.signed_in("outra@pedeai.app", Role::Store, "Outra").await;

    let err = MenuService::new(&intruder)
        .delete_product(store.product.id)
        .await
        .expect_err("not this store");
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(fake.rows("products").len(), 1);
}

#[tokio::test]
async fn test_store_image_upload_updates_profile() {
    let fake = FakeBackend::start().await;
    let (store, store_id) = fake.signed_in("loja@pedeai.app", Role::Store, "Burger Lab").await;

    let url = MenuService::new(&store)
        .update_store_image("Fachada.JPG", vec![0xFF, 0xD8, 0xFF])
        .await
        .expect("upload");

    let path = url.path().to_string();
    assert!(path.starts_with(&format!("/storage/v1/object/public/store-images/{store_id}/")));
    assert!(path.ends_with(".jpg"));
    assert_eq!(fake.object_count(), 1);

    let catalog = CatalogService::new(&store).stores().await.expect("stores");
    assert_eq!(catalog.first().map(|s| s.image.clone()), Some(url.to_string()));
}

// =============================================================================
// Support chat
// =============================================================================

#[tokio::test]
async fn test_support_conversation_round_trip() {
    let fake = FakeBackend::start().await;
    let (customer, customer_id) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let (staff, staff_id) = fake.signed_in("staff@pedeai.app", Role::Staff, "Suporte").await;

    let support = SupportService::new(&customer);
    support
        .send("Meu pedido não chegou")
        .await
        .expect("send");

    let inbox = StaffService::new(&staff).inbox().await.expect("inbox");
    assert_eq!(inbox.len(), 1);
    let conversation = inbox.first().expect("conversation");
    assert_eq!(conversation.user_id, customer_id);
    assert!(conversation.awaiting_staff());

    let reply = StaffService::new(&staff)
        .reply(customer_id, "Vamos verificar com a loja")
        .await
        .expect("reply");
    assert_eq!(reply.sender_type, SupportSender::Staff);
    assert_eq!(reply.staff_id, Some(staff_id));

    let thread = support.messages(customer_id).await.expect("messages");
    let senders: Vec<_> = thread.iter().map(|m| m.sender_type).collect();
    assert_eq!(senders, vec![SupportSender::User, SupportSender::Staff]);

    let inbox = StaffService::new(&staff).inbox().await.expect("inbox");
    assert!(!inbox.first().expect("conversation").awaiting_staff());
}
