//! Axum router configuration for billing endpoints.

use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::adapters::http::middleware::cron_auth_middleware;

use super::handlers::{
    admin_subscriptions, handle_payment_webhook, health, initialize_payment, list_banks,
    resolve_account, run_daily_subscription_job, BillingAppState,
};

/// Webhook routes (no auth, signature verified by the use case).
///
/// - `POST /payment`
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/payment", post(handle_payment_webhook))
}

/// Scheduler routes, guarded by the cron secret.
///
/// - `POST /daily-subscription` with `Authorization: Bearer <secret>`
/// - `GET /daily-subscription?secret=<secret>` for manual runs
pub fn job_routes(state: &BillingAppState) -> Router<BillingAppState> {
    Router::new()
        .route(
            "/daily-subscription",
            post(run_daily_subscription_job).get(run_daily_subscription_job),
        )
        .route_layer(middleware::from_fn_with_state(
            state.secrets.clone(),
            cron_auth_middleware,
        ))
}

/// Admin routes (admin secret checked in the body).
pub fn admin_routes() -> Router<BillingAppState> {
    Router::new().route("/subscriptions", post(admin_subscriptions))
}

/// Vendor-facing payment and bank routes.
pub fn payment_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/initialize", post(initialize_payment))
        .route("/banks", get(list_banks))
        .route("/banks/resolve", get(resolve_account))
}

/// Per-route-group request deadlines.
#[derive(Debug, Clone, Copy)]
pub struct RouteTimeouts {
    /// Webhook, admin and payment routes.
    pub request: Duration,
    /// The daily job walks every subscription and may take minutes.
    pub job: Duration,
}

/// Create the complete billing router.
///
/// ```text
/// POST     /api/webhooks/payment
/// POST|GET /api/jobs/daily-subscription
/// POST     /api/admin/subscriptions
/// POST     /api/billing/initialize
/// GET      /api/billing/banks
/// GET      /api/billing/banks/resolve
/// GET      /health
/// ```
pub fn billing_router(state: BillingAppState, timeouts: RouteTimeouts) -> Router {
    let api = Router::new()
        .nest("/webhooks", webhook_routes())
        .nest("/admin", admin_routes())
        .nest("/billing", payment_routes())
        .layer(TimeoutLayer::new(timeouts.request))
        .nest(
            "/jobs",
            job_routes(&state).layer(TimeoutLayer::new(timeouts.job)),
        );

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
