//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to the billing use cases held by
//! `BillingEngine`. Every handler reads the clock once and passes it down.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::SharedSecrets;
use crate::adapters::paystack::SIGNATURE_HEADER;
use crate::application::handlers::billing::{
    AdminAction, BillingEngine, HandlePaymentWebhookCommand, InitializeSubscriptionPaymentCommand,
    JobScope, ResolveAccountQuery,
};
use crate::domain::billing::BillingError;
use crate::domain::foundation::{Timestamp, VendorId};

use super::dto::{
    AccountResponse, AdminRequest, AdminResponse, BanksResponse, ErrorResponse,
    InitializePaymentRequest, InitializePaymentResponse, JobResponse, ResolveAccountParams,
    WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub engine: Arc<BillingEngine>,
    pub secrets: SharedSecrets,
}

impl BillingAppState {
    pub fn new(engine: Arc<BillingEngine>, secrets: SharedSecrets) -> Self {
        Self { engine, secrets }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/payment
///
/// Takes the raw body so the signature is checked over the exact bytes sent.
pub async fn handle_payment_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature,
        received_at: Timestamp::now(),
    };

    let result = state
        .engine
        .webhook
        .handle(cmd)
        .await
        .map_err(ApiError::Webhook)?;

    Ok(Json(WebhookAck::from(&result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Daily Job
// ════════════════════════════════════════════════════════════════════════════════

/// POST|GET /api/jobs/daily-subscription (cron secret checked by middleware)
pub async fn run_daily_subscription_job(
    State(state): State<BillingAppState>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .engine
        .daily_job
        .run(JobScope::All, Timestamp::now())
        .await?;

    Ok(Json(JobResponse {
        success: true,
        report,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admin/subscriptions
pub async fn admin_subscriptions(
    State(state): State<BillingAppState>,
    body: Result<Json<AdminRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if !state.secrets.is_admin_secret(&request.admin_secret) {
        tracing::warn!("Rejected admin request with bad secret");
        return Err(ApiError::Forbidden);
    }

    let action = AdminAction::try_from(request.action)?;
    let name = action.name();
    let result = state.engine.admin.handle(action, Timestamp::now()).await?;

    Ok(Json(AdminResponse::new(name, result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Payments and Banks
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/initialize
pub async fn initialize_payment(
    State(state): State<BillingAppState>,
    body: Result<Json<InitializePaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let cmd = InitializeSubscriptionPaymentCommand {
        vendor_id: VendorId::new(request.vendor_id).map_err(BillingError::from)?,
        callback_url: request.callback_url,
    };
    let result = state.engine.initialize_payment.handle(cmd).await?;

    Ok(Json(InitializePaymentResponse::from(result)))
}

/// GET /api/billing/banks
pub async fn list_banks(
    State(state): State<BillingAppState>,
) -> Result<impl IntoResponse, ApiError> {
    let banks = state.engine.banks.list_banks().await?;
    Ok(Json(BanksResponse { banks }))
}

/// GET /api/billing/banks/resolve?bankCode=&accountNumber=
pub async fn resolve_account(
    State(state): State<BillingAppState>,
    params: Result<Query<ResolveAccountParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let info = state
        .engine
        .banks
        .resolve_account(ResolveAccountQuery {
            bank_code: params.bank_code,
            account_number: params.account_number,
        })
        .await?;

    Ok(Json(AccountResponse::from(info)))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    Billing(BillingError),
    /// Webhook failures: anything but a bad request must make the gateway
    /// redeliver, so it surfaces as 500.
    Webhook(BillingError),
    /// Missing or wrong admin secret.
    Forbidden,
    /// Body or query string could not be parsed.
    BadRequest(String),
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        ApiError::Billing(err)
    }
}

fn billing_status(err: &BillingError) -> StatusCode {
    match err {
        BillingError::Validation { .. } => StatusCode::BAD_REQUEST,
        BillingError::Auth(_) => StatusCode::UNAUTHORIZED,
        BillingError::NotFound(_) => StatusCode::NOT_FOUND,
        BillingError::TransientGateway(_) => StatusCode::SERVICE_UNAVAILABLE,
        BillingError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        BillingError::JobAlreadyRunning => StatusCode::CONFLICT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Billing(err) => (
                billing_status(err),
                ErrorResponse::new(err.code().to_string(), err.to_string()),
            ),
            ApiError::Webhook(err) => {
                let status = match err {
                    BillingError::Auth(_) | BillingError::Validation { .. } => {
                        StatusCode::BAD_REQUEST
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, ErrorResponse::new(err.code().to_string(), err.to_string()))
            }
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("FORBIDDEN", "Invalid admin secret"),
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("BAD_REQUEST", message.clone()),
            ),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), code = %body.code, message = %body.message, "Billing request failed");
        }

        (status, Json(body)).into_response()
    }
}
