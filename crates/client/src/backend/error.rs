//! Error types for the backend client.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend returned an error body.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// Missing or rejected credentials (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Row or object not found (404, or no row for a single-row read).
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique or foreign-key violation (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rate limited by the backend.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Could not build an endpoint URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A credential could not be used as a header value.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// An operation needs a session but nobody is signed in.
    #[error("not signed in")]
    NotSignedIn,

    /// Realtime connection failure.
    #[error("realtime error: {0}")]
    Realtime(String),
}

/// Error body shapes returned by the auth and table endpoints.
///
/// The table layer answers `{"message", "code", "details", "hint"}` while the
/// auth layer answers either `{"msg", "code"}` or
/// `{"error", "error_description"}`.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub details: Option<String>,
}

impl ApiErrorResponse {
    /// The most specific human-readable message available.
    #[must_use]
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}
