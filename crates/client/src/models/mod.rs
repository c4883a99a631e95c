//! Row types for the backend tables and the patches written to them.

pub mod coupon;
pub mod message;
pub mod order;
pub mod product;
pub mod profile;
pub mod support;

pub use coupon::{Coupon, NewCoupon, normalize_code};
pub use message::OrderMessage;
pub use order::{Address, AddressKind, NewOrder, Order, OrderItem};
pub use product::{NewProduct, Product, ProductUpdate};
pub use profile::{
    CourierAvailability, CourierLocation, DEFAULT_DELIVERY_TIME, DEFAULT_STORE_CATEGORY,
    DEFAULT_STORE_IMAGE, DEFAULT_STORE_NAME, DEFAULT_STORE_RATING, Profile, Store, StoreApproval,
    StoreImage,
};
pub use support::{SupportConversation, SupportMessage, group_conversations};
