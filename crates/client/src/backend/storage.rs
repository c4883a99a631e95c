//! Object storage over `/storage/v1/object`.

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use tracing::instrument;
use url::Url;

use super::{Backend, BackendError, ensure_success};

impl Backend {
    /// Upload bytes to `bucket/path`.
    ///
    /// With `upsert` an existing object at the same path is replaced;
    /// without it the backend answers 409 for an existing path.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{path}"))?;
        let response = self
            .request(Method::POST, url)
            .await
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes)
            .send()
            .await?;
        ensure_success(response).await?;
        tracing::debug!(bucket, path, "Object uploaded");
        Ok(())
    }

    /// Public URL of an object in a public bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined onto the project URL.
    pub fn public_url(&self, bucket: &str, path: &str) -> Result<Url, BackendError> {
        self.endpoint(&format!("storage/v1/object/public/{bucket}/{path}"))
    }
}

/// Best-effort content type from a file extension.
#[must_use]
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}
