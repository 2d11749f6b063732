//! Billing error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | Auth | 401 |
//! | NotFound | 404 (webhook: 500) |
//! | TransientGateway | 503 |
//! | Persistence | 500 |
//! | JobAlreadyRunning | 409 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError, VendorId};

/// Errors surfaced by the billing use cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// Malformed input.
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Bad webhook signature or shared secret. Never retried.
    #[error("Unauthorized: {0}")]
    Auth(String),

    /// Unknown vendor or store.
    #[error("Vendor not found: {0}")]
    NotFound(VendorId),

    /// Gateway timeout or network failure. Outcome unknown.
    #[error("Payment gateway unavailable: {0}")]
    TransientGateway(String),

    /// Storage failure or unresolved write conflict.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Another reconciliation run holds the job lock.
    #[error("Subscription job already running")]
    JobAlreadyRunning,
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        BillingError::Auth(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        BillingError::Persistence(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::Validation { .. } => ErrorCode::ValidationFailed,
            BillingError::Auth(_) => ErrorCode::Unauthorized,
            BillingError::NotFound(_) => ErrorCode::VendorNotFound,
            BillingError::TransientGateway(_) => ErrorCode::GatewayUnavailable,
            BillingError::Persistence(_) => ErrorCode::DatabaseError,
            BillingError::JobAlreadyRunning => ErrorCode::JobAlreadyRunning,
        }
    }

    /// Returns true if the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::TransientGateway(_)
                | BillingError::Persistence(_)
                | BillingError::JobAlreadyRunning
        )
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BillingError::Validation {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::Unauthorized => BillingError::Auth(err.message),
            ErrorCode::VendorNotFound | ErrorCode::StoreNotFound => {
                match err.details.get("vendor_id").map(VendorId::new) {
                    Some(Ok(vendor_id)) => BillingError::NotFound(vendor_id),
                    _ => BillingError::Persistence(err.to_string()),
                }
            }
            ErrorCode::GatewayUnavailable => BillingError::TransientGateway(err.message),
            _ => BillingError::Persistence(err.to_string()),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::EmptyField { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field.clone(),
        };
        BillingError::Validation {
            field,
            message: err.to_string(),
        }
    }
}
