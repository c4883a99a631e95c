//! PedeAí marketplace client library.
//!
//! A typed client over the hosted backend (auth, tables, storage, realtime
//! change feeds), the Gemini text API and the public company registry. Every
//! role of the marketplace is exposed as a service:
//!
//! - [`services::SessionService`] for sign-up, sign-in and role routing
//! - [`services::CatalogService`], [`services::CheckoutService`] and
//!   [`services::OrderService`] for customers
//! - [`services::CourierService`] for delivery couriers
//! - [`services::MenuService`] and [`services::DashboardService`] for stores
//! - [`services::StaffService`] for the back-office
//! - [`services::ChatService`] and [`services::SupportService`] for messaging
//! - [`services::SuggestionService`] for Gemini menu ideas and descriptions
//!
//! # Security
//!
//! The client only ever holds the public anon key and the signed-in user's
//! session. Authorization is enforced by the backend's row-level security;
//! the lifecycle checks here keep honest clients from issuing stale updates.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod registry;
pub mod services;

pub use backend::Backend;
pub use config::PedeaiConfig;
pub use error::ServiceError;
