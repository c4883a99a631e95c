//! Marketplace operations, one service per screen set.
//!
//! # Services
//!
//! - `session` - Sign-up, sign-in and role routing
//! - `catalog` - Stores and menus for customers
//! - `checkout` - Cart, coupons and order placement
//! - `orders` - Order reads, store status changes and order feeds
//! - `courier` - Claiming and delivering orders
//! - `chat` - Per-order chat and optimistic message threads
//! - `menu` - Product CRUD and image uploads for stores
//! - `dashboard` - Store revenue and order board
//! - `staff` - Store approval, coupons and support inbox
//! - `support` - A user's support conversation
//! - `suggestions` - AI menu ideas and product copy with fallbacks
//!
//! Services borrow a shared [`Backend`] and are cheap to build per call.

pub mod catalog;
pub mod chat;
pub mod checkout;
pub mod courier;
pub mod dashboard;
pub mod menu;
pub mod orders;
pub mod session;
pub mod staff;
pub mod suggestions;
pub mod support;

use pedeai_core::UserId;

use crate::backend::Backend;
use crate::error::ServiceError;

pub use catalog::{CatalogService, filter_stores};
pub use chat::{ChatEntry, ChatService, ChatThread, LocalId, PendingState};
pub use checkout::{Cart, CheckoutService, Quote};
pub use courier::{ClaimOutcome, CourierService, Earnings};
pub use dashboard::{DashboardService, DashboardStats, StoreDashboard};
pub use menu::MenuService;
pub use orders::{OrderBoard, OrderService, apply_order_change};
pub use session::{Registered, Registration, Screen, SessionService};
pub use staff::StaffService;
pub use suggestions::{EMPTY_DESCRIPTION, FALLBACK_DESCRIPTION, SuggestionService};
pub use support::SupportService;

/// Id of the signed-in user.
async fn signed_in(backend: &Backend) -> Result<UserId, ServiceError> {
    backend
        .current_user()
        .await
        .map(|user| user.id)
        .ok_or(ServiceError::NotSignedIn)
}
