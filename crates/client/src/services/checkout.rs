//! Cart and checkout.

use pedeai_core::{Money, OrderStatus, PaymentMethod, UserId};
use tracing::instrument;

use crate::backend::{Backend, Query};
use crate::error::ServiceError;
use crate::models::{Address, Coupon, NewOrder, Order, OrderItem, Product, normalize_code};

use super::signed_in;

/// A customer's cart. Orders belong to one store, so the cart does too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<OrderItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Store the cart is bound to, once it has items.
    #[must_use]
    pub fn store_id(&self) -> Option<UserId> {
        self.lines.first().map(|line| line.product.store_id)
    }

    /// Add one unit of `product`; repeated products share a line.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the product is from another store.
    pub fn add(&mut self, product: Product) -> Result<(), ServiceError> {
        if let Some(store_id) = self.store_id()
            && store_id != product.store_id
        {
            return Err(ServiceError::Validation(
                "O carrinho já tem itens de outra loja".to_string(),
            ));
        }

        match self.lines.iter_mut().find(|line| line.product.id == product.id) {
            Some(line) => line.quantity += 1,
            None => self.lines.push(OrderItem {
                product,
                quantity: 1,
            }),
        }
        Ok(())
    }

    /// Remove one unit of the product at `index`, dropping the line at zero.
    pub fn remove(&mut self, index: usize) {
        let Some(line) = self.lines.get_mut(index) else {
            return;
        };
        if line.quantity > 1 {
            line.quantity -= 1;
        } else {
            self.lines.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn lines(&self) -> &[OrderItem] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(OrderItem::line_total).sum()
    }
}

/// What the customer is about to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub coupon_code: Option<String>,
}

impl Quote {
    /// Quote for `cart`, optionally with a coupon applied.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` when the coupon does not apply.
    pub fn new(cart: &Cart, coupon: Option<&Coupon>) -> Result<Self, ServiceError> {
        let subtotal = cart.subtotal();
        let Some(coupon) = coupon else {
            return Ok(Self {
                subtotal,
                discount: Money::ZERO,
                total: subtotal,
                coupon_code: None,
            });
        };

        let discount = coupon.discount().amount_off(subtotal)?;
        Ok(Self {
            subtotal,
            discount,
            total: subtotal.saturating_sub(discount),
            coupon_code: Some(coupon.code.clone()),
        })
    }
}

/// Turns a cart into an order.
pub struct CheckoutService<'a> {
    backend: &'a Backend,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Find an active coupon by code.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for unknown or inactive codes.
    #[instrument(skip(self))]
    pub async fn find_coupon(&self, code: &str) -> Result<Coupon, ServiceError> {
        let code = normalize_code(code);
        self.backend
            .select_first::<Coupon>(
                &Query::table("coupons")
                    .eq("code", &code)
                    .eq("active", true),
            )
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cupom {code}")))
    }

    /// Price the cart, validating `coupon_code` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the coupon is unknown or does not apply.
    pub async fn quote(&self, cart: &Cart, coupon_code: Option<&str>) -> Result<Quote, ServiceError> {
        let coupon = match coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(self.find_coupon(code).await?),
            None => None,
        };
        Quote::new(cart, coupon.as_ref())
    }

    /// Place the cart as a `pending` order for the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for an empty cart or blank address,
    /// or an error from coupon validation or the insert.
    #[instrument(skip(self, cart, address), fields(lines = cart.lines().len()))]
    pub async fn place_order(
        &self,
        cart: &Cart,
        address: &Address,
        payment_method: PaymentMethod,
        coupon_code: Option<&str>,
    ) -> Result<Order, ServiceError> {
        let Some(store_id) = cart.store_id() else {
            return Err(ServiceError::Validation("O carrinho está vazio".to_string()));
        };
        let delivery_line = address.delivery_line();
        if delivery_line.is_empty() {
            return Err(ServiceError::Validation(
                "Informe o endereço de entrega".to_string(),
            ));
        }

        let customer_id = signed_in(self.backend).await?;
        let quote = self.quote(cart, coupon_code).await?;

        let order: Order = self
            .backend
            .insert(
                "orders",
                &NewOrder {
                    customer_id,
                    store_id,
                    items: cart.lines().to_vec(),
                    status: OrderStatus::Pending,
                    total: quote.total,
                    address: delivery_line,
                    payment_method,
                    coupon_code: quote.coupon_code,
                },
            )
            .await?;

        tracing::info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use pedeai_core::{CouponId, DiscountType, ProductId};
    use rust_decimal::Decimal;

    use super::*;

    fn product(store_id: UserId, cents: i64) -> Product {
        Product {
            id: ProductId::random(),
            store_id,
            name: "Pizza Margherita".to_string(),
            description: String::new(),
            price: Money::from_cents(cents),
            category: "Pizza".to_string(),
            image: String::new(),
            created_at: None,
        }
    }

    fn coupon(discount_type: DiscountType, value: Decimal, min_cents: i64) -> Coupon {
        Coupon {
            id: CouponId::random(),
            code: "PEDEAI".to_string(),
            discount_type,
            discount_value: value,
            min_order_value: Money::from_cents(min_cents),
            active: true,
            created_at: None,
        }
    }

    #[test]
    fn test_cart_aggregates_duplicate_products() {
        let store = UserId::random();
        let pizza = product(store, 4_500);
        let soda = product(store, 800);

        let mut cart = Cart::new();
        cart.add(pizza.clone()).expect("add");
        cart.add(soda).expect("add");
        cart.add(pizza).expect("add");

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.subtotal(), Money::from_cents(9_800));
        assert_eq!(cart.store_id(), Some(store));

        cart.remove(0);
        assert_eq!(cart.lines()[0].quantity, 1);
        cart.remove(1);
        cart.remove(7);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_cart_rejects_other_store() {
        let mut cart = Cart::new();
        cart.add(product(UserId::random(), 1_000)).expect("add");
        let result = cart.add(product(UserId::random(), 1_000));
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_quote_with_percentage_coupon() {
        let mut cart = Cart::new();
        cart.add(product(UserId::random(), 5_000)).expect("add");

        let quote = Quote::new(
            &cart,
            Some(&coupon(DiscountType::Percentage, Decimal::TEN, 3_000)),
        )
        .expect("quote");
        assert_eq!(quote.discount, Money::from_cents(500));
        assert_eq!(quote.total, Money::from_cents(4_500));
        assert_eq!(quote.coupon_code.as_deref(), Some("PEDEAI"));
    }

    #[test]
    fn test_quote_below_minimum() {
        let mut cart = Cart::new();
        cart.add(product(UserId::random(), 2_000)).expect("add");
        let result = Quote::new(
            &cart,
            Some(&coupon(DiscountType::Fixed, Decimal::TEN, 3_000)),
        );
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_fixed_coupon_never_goes_negative() {
        let mut cart = Cart::new();
        cart.add(product(UserId::random(), 700)).expect("add");
        let quote = Quote::new(
            &cart,
            Some(&coupon(DiscountType::Fixed, Decimal::TEN, 0)),
        )
        .expect("quote");
        assert_eq!(quote.total, Money::ZERO);
    }

    #[test]
    fn test_quote_without_coupon() {
        let quote = Quote::new(&Cart::new(), None).expect("quote");
        assert_eq!(quote.total, Money::ZERO);
        assert!(quote.coupon_code.is_none());
    }
}
