//! Customer-facing catalog: stores and their menus.

use pedeai_core::{Role, StoreStatus, UserId, category_matches};
use tracing::instrument;

use crate::backend::{Backend, Direction, Query};
use crate::error::ServiceError;
use crate::models::{Product, Profile, Store};

/// Store and product browsing.
pub struct CatalogService<'a> {
    backend: &'a Backend,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// All stores visible to customers.
    ///
    /// Rejected stores are hidden; pending ones are still listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn stores(&self) -> Result<Vec<Store>, ServiceError> {
        let profiles: Vec<Profile> = self
            .backend
            .select(&Query::table("profiles").eq("role", Role::Store))
            .await?;

        Ok(profiles
            .iter()
            .map(Store::from)
            .filter(|store| store.status != StoreStatus::Rejected)
            .collect())
    }

    /// Stores matching a category filter and a name search.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn search_stores(&self, category: &str, search: &str) -> Result<Vec<Store>, ServiceError> {
        Ok(filter_stores(self.stores().await?, category, search))
    }

    /// One store's menu, newest products first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn products(&self, store_id: UserId) -> Result<Vec<Product>, ServiceError> {
        Ok(self
            .backend
            .select(
                &Query::table("products")
                    .eq("store_id", store_id)
                    .order("created_at", Direction::Desc),
            )
            .await?)
    }

    /// Every product across stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all_products(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self
            .backend
            .select(&Query::table("products").order("created_at", Direction::Desc))
            .await?)
    }
}

/// Apply the home-screen category filter and name search.
#[must_use]
pub fn filter_stores(stores: Vec<Store>, category: &str, search: &str) -> Vec<Store> {
    stores
        .into_iter()
        .filter(|store| category_matches(category, &store.category) && store.name_matches(search))
        .collect()
}
