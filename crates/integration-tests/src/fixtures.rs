//! Marketplace scenarios built through the real services.

use pedeai_client::Backend;
use pedeai_client::models::{Address, AddressKind, NewProduct, Order, Product};
use pedeai_client::services::{Cart, CheckoutService, MenuService, OrderService};
use pedeai_core::{Money, OrderStatus, PaymentMethod, Role, UserId};

use crate::FakeBackend;

/// A signed-in store with one product on its menu.
pub struct StoreFixture {
    pub backend: Backend,
    pub id: UserId,
    pub product: Product,
}

/// Sign a store in and add a product priced at `price_cents`.
///
/// # Panics
///
/// Panics if sign-in or the insert fails.
pub async fn store_with_product(fake: &FakeBackend, email: &str, price_cents: i64) -> StoreFixture {
    let (backend, id) = fake.signed_in(email, Role::Store, "Burger Lab").await;
    let product = MenuService::new(&backend)
        .add_product(&NewProduct {
            name: "X-Bacon".to_string(),
            description: "Pão brioche, blend 160g e bacon crocante".to_string(),
            price: Money::from_cents(price_cents),
            category: "Hambúrgueres".to_string(),
            image: String::new(),
        })
        .await
        .expect("add product");
    StoreFixture {
        backend,
        id,
        product,
    }
}

#[must_use]
pub fn home_address() -> Address {
    Address {
        label: "Casa".to_string(),
        details: "Av. Paulista, 1578 - Bela Vista".to_string(),
        complement: Some("Apto 42".to_string()),
        kind: AddressKind::Home,
    }
}

/// Place an order of `quantity` units of `product`.
///
/// # Panics
///
/// Panics if the checkout fails.
pub async fn place_order(
    customer: &Backend,
    product: &Product,
    quantity: u32,
    coupon: Option<&str>,
) -> Order {
    let mut cart = Cart::new();
    for _ in 0..quantity {
        cart.add(product.clone()).expect("add to cart");
    }
    CheckoutService::new(customer)
        .place_order(&cart, &home_address(), PaymentMethod::Pix, coupon)
        .await
        .expect("place order")
}

/// Take an order from `pending` to `ready` as its store.
///
/// # Panics
///
/// Panics if either transition fails.
pub async fn make_ready(store: &Backend, order: &Order) -> Order {
    let orders = OrderService::new(store);
    orders
        .update_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
        .await
        .expect("confirm");
    orders
        .update_status(order.id, OrderStatus::Confirmed, OrderStatus::Ready)
        .await
        .expect("ready")
}
