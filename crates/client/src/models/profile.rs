//! Profiles and the store listing derived from them.

use chrono::{DateTime, Utc};
use pedeai_core::{Role, StoreStatus, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STORE_NAME: &str = "Loja sem nome";
pub const DEFAULT_DELIVERY_TIME: &str = "30-40 min";
pub const DEFAULT_STORE_IMAGE: &str =
    "https://images.unsplash.com/photo-1546069901-ba9599a7e63c?w=400&q=80";
pub const DEFAULT_STORE_CATEGORY: &str = "Geral";
/// Rating shown for stores that have none yet (5.0).
pub const DEFAULT_STORE_RATING: Decimal = Decimal::from_parts(50, 0, 0, false, 1);

/// A `profiles` row: one per auth user, tagged with a role.
///
/// Store- and courier-specific columns are null for other roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default)]
    pub cnh: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub rating: Option<Decimal>,
    /// Back-office approval state (stores only).
    #[serde(default)]
    pub status: Option<StoreStatus>,
    #[serde(default)]
    pub is_online: Option<bool>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A store as listed in the customer catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: UserId,
    pub name: String,
    pub rating: Decimal,
    pub delivery_time: String,
    pub image: String,
    pub category: String,
    pub status: StoreStatus,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl From<&Profile> for Store {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            name: non_empty(profile.full_name.as_deref())
                .unwrap_or(DEFAULT_STORE_NAME)
                .to_string(),
            rating: profile
                .rating
                .filter(|r| !r.is_zero())
                .unwrap_or(DEFAULT_STORE_RATING),
            delivery_time: non_empty(profile.delivery_time.as_deref())
                .unwrap_or(DEFAULT_DELIVERY_TIME)
                .to_string(),
            image: non_empty(profile.image_url.as_deref())
                .unwrap_or(DEFAULT_STORE_IMAGE)
                .to_string(),
            category: non_empty(profile.category.as_deref())
                .unwrap_or(DEFAULT_STORE_CATEGORY)
                .to_string(),
            status: profile.status.unwrap_or_default(),
        }
    }
}

impl Store {
    /// Case-insensitive match on the store name.
    #[must_use]
    pub fn name_matches(&self, search: &str) -> bool {
        let search = search.trim();
        search.is_empty() || self.name.to_lowercase().contains(&search.to_lowercase())
    }
}

/// Patch for a courier's availability.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CourierAvailability {
    pub is_online: bool,
}

/// Patch for a courier's position.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CourierLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Patch for a store's profile photo.
#[derive(Debug, Clone, Serialize)]
pub struct StoreImage {
    pub image_url: String,
}

/// Patch for a store's approval state.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StoreApproval {
    pub status: StoreStatus,
}
