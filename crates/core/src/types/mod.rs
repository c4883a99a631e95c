//! Core types for PedeAí.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod catalog;
pub mod cnpj;
pub mod discount;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use catalog::{ALL_CATEGORIES, CATEGORIES, category_matches};
pub use cnpj::{Cnpj, CnpjError, format_cnpj};
pub use discount::{Discount, DiscountError, DiscountType};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{COURIER_COMMISSION_RATE, Money, courier_commission};
pub use status::*;
