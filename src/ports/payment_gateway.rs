//! Payment gateway port.
//!
//! Thin contract over the external payment provider. Provider error shapes
//! are normalized into `GatewayError`; callers only ever see the handful of
//! fields billing needs (reference, amount, correlation id).
//!
//! Gateway calls never mutate subscription state. A timed-out charge is an
//! unknown outcome; the provider's webhook, when it arrives, is what moves
//! the record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingError, PaymentEvent};
use crate::domain::foundation::VendorId;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a charge. Returns the hosted payment page and its reference.
    async fn initialize_payment(
        &self,
        request: InitializePaymentRequest,
    ) -> Result<ChargeHandle, GatewayError>;

    /// Check a webhook signature over the raw request body.
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool;

    /// Parse an already verified webhook body into a payment event.
    ///
    /// Event types billing does not act on come back as `Ignored`.
    fn parse_webhook_event(&self, payload: &[u8]) -> Result<WebhookNotice, GatewayError>;

    /// Resolve an account number to its holder's name.
    async fn resolve_bank_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> Result<AccountInfo, GatewayError>;

    /// Banks supported for payouts. Implementations cache this list.
    async fn list_banks(&self) -> Result<Vec<Bank>, GatewayError>;
}

/// What a verified webhook body means to billing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookNotice {
    Payment(PaymentEvent),
    /// Event type billing does not handle.
    Ignored { event: String },
}

/// Request to start a subscription charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializePaymentRequest {
    /// Vendor the charge pays for; echoed back in webhook metadata.
    pub vendor_id: VendorId,

    /// Amount in minor currency units.
    pub amount: i64,

    pub email: String,

    pub currency: String,

    /// Where the provider redirects after payment.
    pub callback_url: Option<String>,
}

/// Handle of an initialized charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeHandle {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

/// Resolved bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_number: String,
    pub account_name: String,
    pub bank_code: String,
}

/// Bank supported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    pub name: String,
    pub code: String,
    pub slug: Option<String>,
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Network, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Rejected, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Authentication, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Gateway error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    Timeout,
    Network,
    /// Provider refused the request (validation, declined).
    Rejected,
    NotFound,
    /// Our secret key was refused.
    Authentication,
    /// Provider answered with something we could not parse.
    InvalidResponse,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayErrorCode::Timeout | GatewayErrorCode::Network)
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::Network => "network_error",
            GatewayErrorCode::Rejected => "rejected",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::Authentication => "authentication_error",
            GatewayErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}

impl From<GatewayError> for BillingError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            GatewayErrorCode::Timeout | GatewayErrorCode::Network => {
                BillingError::TransientGateway(err.message)
            }
            GatewayErrorCode::Rejected | GatewayErrorCode::NotFound => {
                BillingError::validation("gateway", err.message)
            }
            GatewayErrorCode::Authentication | GatewayErrorCode::InvalidResponse => {
                BillingError::TransientGateway(err.to_string())
            }
        }
    }
}
