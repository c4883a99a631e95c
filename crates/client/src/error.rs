//! Service-level error type shared by every role's operations.

use pedeai_core::{CnpjError, DiscountError, EmailError, TransitionError};
use thiserror::Error;

use crate::backend::BackendError;
use crate::gemini::GeminiError;
use crate::registry::RegistryError;

/// Errors returned by the marketplace services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Gemini request failed.
    #[error("Gemini error: {0}")]
    Gemini(#[from] GeminiError),

    /// Company registry lookup failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The order lifecycle forbids the requested change.
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    /// A conditional update matched no rows; the row moved on since it was read.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No user is signed in.
    #[error("Not signed in")]
    NotSignedIn,

    /// The signed-in user may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Input rejected before reaching the backend.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<CnpjError> for ServiceError {
    fn from(err: CnpjError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EmailError> for ServiceError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<DiscountError> for ServiceError {
    fn from(err: DiscountError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl ServiceError {
    /// Whether the failure came from a remote dependency rather than the caller.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Gemini(_) | Self::Registry(_))
    }
}

#[cfg(test)]
mod tests {
    use pedeai_core::OrderStatus;

    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::Conflict("order already moved".to_string());
        assert_eq!(err.to_string(), "Conflict: order already moved");

        let err = ServiceError::from(TransitionError {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        });
        assert_eq!(
            err.to_string(),
            "Invalid transition: order cannot move from delivered to pending"
        );
    }

    #[test]
    fn test_domain_errors_become_validation() {
        let err = ServiceError::from(CnpjError::Repeated);
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(!err.is_remote());

        let err = ServiceError::from(BackendError::RateLimited(60));
        assert!(err.is_remote());
    }
}
