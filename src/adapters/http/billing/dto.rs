//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! Request bodies carry raw strings; identifiers are validated when the DTO
//! is converted into its command so a bad id is a 400, not a parse failure.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    AdminAction, AdminActionResult, HandlePaymentWebhookResult, InitializeSubscriptionPaymentResult,
    JobReport, SubscriptionOverview, SubscriptionSnapshot,
};
use crate::domain::billing::{BillingError, TransitionOutcome};
use crate::domain::foundation::{PaymentReference, VendorId};
use crate::ports::{AccountInfo, Bank};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Admin request: `{ "action": "...", "adminSecret": "...", "vendorId"?: "..." }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequest {
    #[serde(default)]
    pub admin_secret: String,
    #[serde(flatten)]
    pub action: AdminActionRequest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminActionRequest {
    SendExpiryWarnings,
    SendGracePeriodWarnings,
    ProcessExpiredGracePeriods,
    FreezeVendor {
        #[serde(rename = "vendorId")]
        vendor_id: String,
    },
    ReactivateVendor {
        #[serde(rename = "vendorId")]
        vendor_id: String,
        #[serde(rename = "paymentReference")]
        payment_reference: String,
    },
    CancelVendor {
        #[serde(rename = "vendorId")]
        vendor_id: String,
    },
    GetVendorStatus {
        #[serde(rename = "vendorId")]
        vendor_id: String,
    },
    GetAllSubscriptionStatus,
}

impl TryFrom<AdminActionRequest> for AdminAction {
    type Error = BillingError;

    fn try_from(request: AdminActionRequest) -> Result<Self, Self::Error> {
        Ok(match request {
            AdminActionRequest::SendExpiryWarnings => AdminAction::SendExpiryWarnings,
            AdminActionRequest::SendGracePeriodWarnings => AdminAction::SendGracePeriodWarnings,
            AdminActionRequest::ProcessExpiredGracePeriods => {
                AdminAction::ProcessExpiredGracePeriods
            }
            AdminActionRequest::FreezeVendor { vendor_id } => AdminAction::FreezeVendor {
                vendor_id: VendorId::new(vendor_id)?,
            },
            AdminActionRequest::ReactivateVendor {
                vendor_id,
                payment_reference,
            } => AdminAction::ReactivateVendor {
                vendor_id: VendorId::new(vendor_id)?,
                reference: PaymentReference::new(payment_reference)?,
            },
            AdminActionRequest::CancelVendor { vendor_id } => AdminAction::CancelVendor {
                vendor_id: VendorId::new(vendor_id)?,
            },
            AdminActionRequest::GetVendorStatus { vendor_id } => AdminAction::GetVendorStatus {
                vendor_id: VendorId::new(vendor_id)?,
            },
            AdminActionRequest::GetAllSubscriptionStatus => AdminAction::GetAllSubscriptionStatus,
        })
    }
}

/// Request to start a subscription charge.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
    pub vendor_id: String,
    #[serde(default)]
    pub callback_url: Option<String>,
}

/// Query for `GET /api/billing/banks/resolve`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAccountParams {
    pub bank_code: String,
    pub account_number: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Webhook acknowledgement. The gateway only looks at the status code.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    /// `applied`, `no_change` or `ignored`.
    pub result: &'static str,
}

impl From<&HandlePaymentWebhookResult> for WebhookAck {
    fn from(result: &HandlePaymentWebhookResult) -> Self {
        let result = match result {
            HandlePaymentWebhookResult::Applied { .. } => "applied",
            HandlePaymentWebhookResult::NoChange { .. } => "no_change",
            HandlePaymentWebhookResult::Ignored { .. } => "ignored",
        };
        Self {
            success: true,
            result,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobResponse {
    pub success: bool,
    pub report: JobReport,
}

/// Admin response; exactly one of the payload fields is set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminResponse {
    pub success: bool,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<JobReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TransitionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_sent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<SubscriptionOverview>,
}

impl AdminResponse {
    pub fn new(action: &'static str, result: AdminActionResult) -> Self {
        let mut response = Self {
            success: true,
            action,
            report: None,
            subscription: None,
            outcome: None,
            notifications_sent: None,
            overview: None,
        };
        match result {
            AdminActionResult::Job(report) => response.report = Some(report),
            AdminActionResult::Vendor {
                snapshot,
                outcome,
                notifications_sent,
            } => {
                response.subscription = Some(snapshot);
                response.outcome = outcome;
                response.notifications_sent = Some(notifications_sent);
            }
            AdminActionResult::Overview(overview) => response.overview = Some(overview),
        }
        response
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentResponse {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
    pub amount: i64,
    pub currency: String,
}

impl From<InitializeSubscriptionPaymentResult> for InitializePaymentResponse {
    fn from(result: InitializeSubscriptionPaymentResult) -> Self {
        Self {
            authorization_url: result.charge.authorization_url,
            access_code: result.charge.access_code,
            reference: result.charge.reference,
            amount: result.amount,
            currency: result.currency,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BanksResponse {
    pub banks: Vec<Bank>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub account_number: String,
    pub account_name: String,
    pub bank_code: String,
}

impl From<AccountInfo> for AccountResponse {
    fn from(info: AccountInfo) -> Self {
        Self {
            account_number: info.account_number,
            account_name: info.account_name,
            bank_code: info.bank_code,
        }
    }
}

/// Standard error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
