//! Delivery claims: the race between couriers and the one-active-delivery rule.

use pedeai_client::ServiceError;
use pedeai_client::services::{ClaimOutcome, CourierService};
use pedeai_core::{Email, Money, OrderStatus, Role, UserId};
use pedeai_integration_tests::{FakeBackend, PASSWORD};
use pedeai_integration_tests::fixtures::{make_ready, place_order, store_with_product};
use secrecy::SecretString;
use serde_json::json;

fn held_by(fake: &FakeBackend, courier_id: UserId) -> usize {
    fake.rows("orders")
        .iter()
        .filter(|row| row["courier_id"] == json!(courier_id) && row["status"] == json!("accepted"))
        .count()
}

// =============================================================================
// Claim race
// =============================================================================

#[tokio::test]
async fn test_concurrent_claims_have_one_winner() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 4_000).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let order = place_order(&customer, &store.product, 1, None).await;
    make_ready(&store.backend, &order).await;

    let (first, first_id) = fake.signed_in("moto1@pedeai.app", Role::Courier, "Rafa").await;
    let (second, second_id) = fake.signed_in("moto2@pedeai.app", Role::Courier, "Bia").await;

    let first_service = CourierService::new(&first);
    let second_service = CourierService::new(&second);
    let (a, b) = tokio::join!(
        first_service.claim(order.id, first_id),
        second_service.claim(order.id, second_id),
    );
    let outcomes = [a.expect("first claim"), b.expect("second claim")];

    let winners: Vec<_> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            ClaimOutcome::Claimed(order) => Some(order),
            ClaimOutcome::AlreadyClaimed => None,
        })
        .collect();
    assert_eq!(winners.len(), 1);
    let winner = winners.first().expect("winner");
    assert_eq!(winner.status, OrderStatus::Accepted);
    assert!(winner.courier_id == Some(first_id) || winner.courier_id == Some(second_id));

    let stored = fake
        .rows("orders")
        .into_iter()
        .find(|row| row["id"] == json!(order.id))
        .expect("stored order");
    assert_eq!(stored["courier_id"], json!(winner.courier_id));
    assert!(first_service.available().await.expect("available").is_empty());
}

#[tokio::test]
async fn test_claim_of_unready_order_reports_already_claimed() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 4_000).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let order = place_order(&customer, &store.product, 1, None).await;
    let (courier, _) = fake.signed_in("moto@pedeai.app", Role::Courier, "Rafa").await;

    let outcome = CourierService::new(&courier)
        .claim_for_me(order.id)
        .await
        .expect("claim");
    assert_eq!(outcome, ClaimOutcome::AlreadyClaimed);
}

#[tokio::test]
async fn test_cannot_claim_for_another_courier() {
    let fake = FakeBackend::start().await;
    let (courier, _) = fake.signed_in("moto1@pedeai.app", Role::Courier, "Rafa").await;
    let (_, other_id) = fake.signed_in("moto2@pedeai.app", Role::Courier, "Bia").await;

    let err = CourierService::new(&courier)
        .claim(pedeai_core::OrderId::random(), other_id)
        .await
        .expect_err("forbidden");
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

// =============================================================================
// One delivery at a time
// =============================================================================

#[tokio::test]
async fn test_active_delivery_blocks_new_claims_until_delivered() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 4_000).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let first = place_order(&customer, &store.product, 1, None).await;
    let second = place_order(&customer, &store.product, 2, None).await;
    make_ready(&store.backend, &first).await;
    make_ready(&store.backend, &second).await;

    let (courier, courier_id) = fake.signed_in("moto@pedeai.app", Role::Courier, "Rafa").await;
    let service = CourierService::new(&courier);

    let available = service.available().await.expect("available");
    assert_eq!(
        available.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );

    assert!(matches!(
        service.claim_for_me(first.id).await.expect("claim"),
        ClaimOutcome::Claimed(_)
    ));
    let err = service
        .claim_for_me(second.id)
        .await
        .expect_err("second claim");
    assert!(matches!(err, ServiceError::Conflict(_)));

    let shipping = service.confirm_collection(first.id).await.expect("pickup");
    assert_eq!(shipping.status, OrderStatus::Shipping);
    let err = service
        .claim_for_me(second.id)
        .await
        .expect_err("still busy");
    assert!(matches!(err, ServiceError::Conflict(_)));

    let delivered = service.complete(first.id).await.expect("deliver");
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(service.active_delivery(courier_id).await.expect("active").is_none());

    assert!(matches!(
        service.claim_for_me(second.id).await.expect("claim after delivery"),
        ClaimOutcome::Claimed(_)
    ));
}

#[tokio::test]
async fn test_parallel_claims_by_one_courier_keep_one_delivery() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 4_000).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let first = place_order(&customer, &store.product, 1, None).await;
    let second = place_order(&customer, &store.product, 2, None).await;
    make_ready(&store.backend, &first).await;
    make_ready(&store.backend, &second).await;

    let (courier, courier_id) = fake.signed_in("moto@pedeai.app", Role::Courier, "Rafa").await;
    let service = CourierService::new(&courier);
    let (a, b) = tokio::join!(service.claim_for_me(first.id), service.claim_for_me(second.id));

    let claimed = [a, b]
        .into_iter()
        .filter(|result| match result {
            Ok(ClaimOutcome::Claimed(_)) => true,
            Err(ServiceError::Conflict(_)) => false,
            other => panic!("unexpected claim result: {other:?}"),
        })
        .count();
    assert_eq!(claimed, 1);
    assert_eq!(held_by(&fake, courier_id), 1);
    assert_eq!(service.available().await.expect("available").len(), 1);
}

#[tokio::test]
async fn test_same_courier_on_two_devices_never_holds_two_deliveries() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 4_000).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let first = place_order(&customer, &store.product, 1, None).await;
    let second = place_order(&customer, &store.product, 2, None).await;
    make_ready(&store.backend, &first).await;
    make_ready(&store.backend, &second).await;

    let (phone, courier_id) = fake.signed_in("moto@pedeai.app", Role::Courier, "Rafa").await;
    let tablet = fake.client();
    tablet
        .sign_in_with_password(
            &Email::parse("moto@pedeai.app").expect("email"),
            &SecretString::from(PASSWORD),
        )
        .await
        .expect("second sign in");

    let phone_service = CourierService::new(&phone);
    let tablet_service = CourierService::new(&tablet);
    let (a, b) = tokio::join!(
        phone_service.claim_for_me(first.id),
        tablet_service.claim_for_me(second.id),
    );

    let claimed = [a, b]
        .into_iter()
        .filter(|result| match result {
            Ok(ClaimOutcome::Claimed(_)) => true,
            Err(ServiceError::Conflict(_)) => false,
            other => panic!("unexpected claim result: {other:?}"),
        })
        .count();
    assert!(claimed <= 1);
    assert_eq!(held_by(&fake, courier_id), claimed);

    // Released orders go back to the pool.
    let available = phone_service.available().await.expect("available");
    assert_eq!(available.len(), 2 - claimed);
    assert!(available.iter().all(|order| order.courier_id.is_none()));
}

#[tokio::test]
async fn test_steps_require_the_owning_courier_and_order() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 4_000).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let order = place_order(&customer, &store.product, 1, None).await;
    make_ready(&store.backend, &order).await;

    let (owner, _) = fake.signed_in("moto1@pedeai.app", Role::Courier, "Rafa").await;
    let (other, _) = fake.signed_in("moto2@pedeai.app", Role::Courier, "Bia").await;
    CourierService::new(&owner)
        .claim_for_me(order.id)
        .await
        .expect("claim");

    let err = CourierService::new(&other)
        .confirm_collection(order.id)
        .await
        .expect_err("not the owner");
    assert!(matches!(err, ServiceError::Conflict(_)));

    let err = CourierService::new(&owner)
        .complete(order.id)
        .await
        .expect_err("not picked up yet");
    assert!(matches!(err, ServiceError::Conflict(_)));
}

// =============================================================================
// Earnings and availability
// =============================================================================

#[tokio::test]
async fn test_earnings_sum_commission_over_deliveries() {
    let fake = FakeBackend::start().await;
    let store = store_with_product(&fake, "loja@pedeai.app", 4_000).await;
    let (customer, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let (courier, courier_id) = fake.signed_in("moto@pedeai.app", Role::Courier, "Rafa").await;
    let service = CourierService::new(&courier);

    for quantity in [1, 2] {
        let order = place_order(&customer, &store.product, quantity, None).await;
        make_ready(&store.backend, &order).await;
        service.claim_for_me(order.id).await.expect("claim");
        service.confirm_collection(order.id).await.expect("pickup");
        service.complete(order.id).await.expect("deliver");
    }

    let earnings = service.earnings(courier_id).await.expect("earnings");
    assert_eq!(earnings.deliveries, 2);
    // 15% of 40.00 + 15% of 80.00
    assert_eq!(earnings.total, Money::from_cents(1_800));

    let history = service.history(courier_id).await.expect("history");
    assert_eq!(history.len(), 2);
    assert!(history.first().expect("newest").total > history.last().expect("oldest").total);
}

#[tokio::test]
async fn test_online_flag_and_location_update_profile() {
    let fake = FakeBackend::start().await;
    let (courier, courier_id) = fake.signed_in("moto@pedeai.app", Role::Courier, "Rafa").await;
    let service = CourierService::new(&courier);

    service.set_online(true).await.expect("online");
    service
        .update_location(-23.561_684, -46.655_981)
        .await
        .expect("location");
    let err = service
        .update_location(123.0, 0.0)
        .await
        .expect_err("out of range");
    assert!(matches!(err, ServiceError::Validation(_)));

    let profile = fake
        .rows("profiles")
        .into_iter()
        .find(|row| row["id"] == json!(courier_id))
        .expect("profile");
    assert_eq!(profile["is_online"], json!(true));
    assert_eq!(profile["latitude"], json!(-23.561_684));
}
