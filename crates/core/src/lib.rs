//! PedeAí Core - Shared domain types.
//!
//! This crate provides the types used across all PedeAí components:
//! - `client` - Typed client for the hosted backend, AI and registry APIs
//! - `cli` - Command-line front-end driving every marketplace role
//! - `integration-tests` - End-to-end tests against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Validation and lifecycle rules that must hold regardless of which
//! screen issues a write (order transitions, CNPJ check digits, coupon math)
//! live here so they can be tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, statuses, email, CNPJ and discounts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
