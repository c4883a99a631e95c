//! Store menu management and store images.

use pedeai_core::{Money, ProductId, UserId};
use tracing::instrument;
use url::Url;

use crate::backend::{Backend, Query, content_type_for};
use crate::error::ServiceError;
use crate::models::product::ProductInsert;
use crate::models::{NewProduct, Product, ProductUpdate, StoreImage};

use super::signed_in;

/// Product CRUD for the signed-in store.
pub struct MenuService<'a> {
    backend: &'a Backend,
}

impl<'a> MenuService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Add a product to the signed-in store's menu.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a blank name or non-positive
    /// price.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add_product(&self, product: &NewProduct) -> Result<Product, ServiceError> {
        validate_product(&product.name, product.price)?;
        let store_id = signed_in(self.backend).await?;

        let created: Product = self
            .backend
            .insert("products", &ProductInsert { store_id, product })
            .await?;
        tracing::info!(product_id = %created.id, "Product added");
        Ok(created)
    }

    /// Edit a product of the signed-in store.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product is not on this
    /// store's menu.
    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        product_id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::Validation("Nada para atualizar".to_string()));
        }
        if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ServiceError::Validation("Informe o nome do produto".to_string()));
        }
        if let Some(price) = update.price
            && price <= Money::ZERO
        {
            return Err(ServiceError::Validation(format!("Preço inválido: {price}")));
        }

        let store_id = signed_in(self.backend).await?;
        let updated: Vec<Product> = self
            .backend
            .update(
                &Query::table("products")
                    .eq("id", product_id)
                    .eq("store_id", store_id),
                update,
            )
            .await?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(format!("Produto {product_id}")))
    }

    /// Remove a product from the signed-in store's menu.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if nothing was deleted.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: ProductId) -> Result<(), ServiceError> {
        let store_id = signed_in(self.backend).await?;
        let removed = self
            .backend
            .delete(
                &Query::table("products")
                    .eq("id", product_id)
                    .eq("store_id", store_id),
            )
            .await?;
        if removed == 0 {
            return Err(ServiceError::NotFound(format!("Produto {product_id}")));
        }
        tracing::info!(product_id = %product_id, "Product deleted");
        Ok(())
    }

    /// Upload a product photo and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_product_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Url, ServiceError> {
        let store_id = signed_in(self.backend).await?;
        let bucket = &self.backend.config().product_images_bucket;
        self.upload_image(bucket, store_id, file_name, bytes).await
    }

    /// Upload a new store photo and point the store profile at it.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload or the profile update fails.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn update_store_image(&self, file_name: &str, bytes: Vec<u8>) -> Result<Url, ServiceError> {
        let store_id = signed_in(self.backend).await?;
        let bucket = &self.backend.config().store_images_bucket;
        let url = self.upload_image(bucket, store_id, file_name, bytes).await?;

        let _: Vec<serde_json::Value> = self
            .backend
            .update(
                &Query::table("profiles").eq("id", store_id),
                &StoreImage {
                    image_url: url.to_string(),
                },
            )
            .await?;
        Ok(url)
    }

    async fn upload_image(
        &self,
        bucket: &str,
        store_id: UserId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Url, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::Validation("Arquivo vazio".to_string()));
        }
        let extension = file_extension(file_name);
        let path = image_path(store_id, extension, rand::random());

        self.backend
            .upload(bucket, &path, bytes, content_type_for(extension), false)
            .await?;
        Ok(self.backend.public_url(bucket, &path)?)
    }
}

fn validate_product(name: &str, price: Money) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation("Informe o nome do produto".to_string()));
    }
    if price <= Money::ZERO {
        return Err(ServiceError::Validation(format!("Preço inválido: {price}")));
    }
    Ok(())
}

/// Extension after the last dot, or `bin` when there is none or it is not
/// plain ASCII letters and digits.
fn file_extension(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .unwrap_or("bin")
}

/// Object path for an uploaded image: `<store>/<random>.<ext>`.
fn image_path(store_id: UserId, extension: &str, nonce: u64) -> String {
    format!("{store_id}/{nonce:016x}.{}", extension.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("coxinha.JPG"), "JPG");
        assert_eq!(file_extension("foto.final.webp"), "webp");
        assert_eq!(file_extension("sem_extensao"), "bin");
        assert_eq!(file_extension("pasta.v2/arquivo"), "bin");
        assert_eq!(file_extension("foto.jp#g"), "bin");
        assert_eq!(file_extension("foto.png?v=2"), "bin");
        assert_eq!(file_extension("açaí.pñg"), "bin");
    }

    #[test]
    fn test_image_path() {
        let store: UserId = "9a1f1d4e-2a51-4c1e-8d8e-5b8f7f0c6d21".parse().expect("uuid");
        assert_eq!(
            image_path(store, "PNG", 0xdead_beef),
            "9a1f1d4e-2a51-4c1e-8d8e-5b8f7f0c6d21/00000000deadbeef.png"
        );
    }

    #[test]
    fn test_validate_product() {
        assert!(validate_product("Pastel de Queijo", Money::from_cents(900)).is_ok());
        assert!(validate_product("  ", Money::from_cents(900)).is_err());
        assert!(validate_product("Pastel", Money::ZERO).is_err());
    }
}
