//! Error types for the Gemini API client.

use thiserror::Error;

/// Errors that can occur when interacting with the Gemini API.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gemini API returned an error.
    #[error("API error ({status}): {message}")]
    Api {
        /// Status name from the API (e.g. `INVALID_ARGUMENT`).
        status: String,
        /// Error message.
        message: String,
    },

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// The model returned no text (e.g. blocked by safety filters).
    #[error("empty response")]
    EmptyResponse,

    /// Prompt template failed to render.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    /// The API key cannot be sent as a header.
    #[error("invalid API key header: {0}")]
    InvalidHeader(String),
}

/// API error response from Gemini.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Nested error details.
    pub error: ApiError,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    /// Numeric HTTP code.
    #[serde(default)]
    pub code: u16,
    /// Error message.
    pub message: String,
    /// Status name.
    #[serde(default)]
    pub status: String,
}
