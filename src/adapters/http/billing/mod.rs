//! Billing HTTP adapter.
//!
//! Exposes the payment webhook, the daily job trigger, operator actions and
//! the vendor-facing payment endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{AdminActionRequest, AdminRequest, AdminResponse, ErrorResponse, JobResponse, WebhookAck};
pub use handlers::{ApiError, BillingAppState};
pub use routes::{
    admin_routes, billing_router, job_routes, payment_routes, webhook_routes, RouteTimeouts,
};
