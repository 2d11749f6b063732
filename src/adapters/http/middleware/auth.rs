//! Shared-secret authentication for the job and admin endpoints.
//!
//! This module provides:
//! - `cron_auth_middleware` - Layer that admits the scheduler by its cron secret
//! - `SharedSecrets` - The configured cron and admin secrets
//!
//! All comparisons run in constant time (`subtle`).
//!
//! ```text
//! POST /api/jobs/daily-subscription   Authorization: Bearer <cron_secret>
//! GET  /api/jobs/daily-subscription?secret=<cron_secret>
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

/// Secrets guarding the operator endpoints.
#[derive(Clone)]
pub struct SharedSecrets {
    cron_secret: Arc<SecretString>,
    admin_secret: Arc<SecretString>,
}

impl SharedSecrets {
    pub fn new(cron_secret: impl Into<String>, admin_secret: impl Into<String>) -> Self {
        Self {
            cron_secret: Arc::new(SecretString::new(cron_secret.into())),
            admin_secret: Arc::new(SecretString::new(admin_secret.into())),
        }
    }

    pub fn is_cron_secret(&self, provided: &str) -> bool {
        secrets_match(&self.cron_secret, provided)
    }

    pub fn is_admin_secret(&self, provided: &str) -> bool {
        secrets_match(&self.admin_secret, provided)
    }
}

impl std::fmt::Debug for SharedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecrets([REDACTED])")
    }
}

/// Constant-time comparison. An empty configured secret admits nobody.
pub fn secrets_match(expected: &SecretString, provided: &str) -> bool {
    let expected = expected.expose_secret().as_bytes();
    if expected.is_empty() {
        return false;
    }
    expected.ct_eq(provided.as_bytes()).into()
}

/// Cron secret from `Authorization: Bearer` or the `secret` query parameter.
fn provided_cron_secret(request: &Request) -> Option<String> {
    let bearer = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);
    if bearer.is_some() {
        return bearer;
    }

    request.uri().query().and_then(|query| {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "secret")
            .map(|(_, value)| value.to_string())
    })
}

/// Rejects requests that do not carry the cron secret with 401.
pub async fn cron_auth_middleware(
    State(secrets): State<SharedSecrets>,
    request: Request,
    next: Next,
) -> Response {
    match provided_cron_secret(&request) {
        Some(secret) if secrets.is_cron_secret(&secret) => next.run(request).await,
        provided => {
            tracing::warn!(
                path = %request.uri().path(),
                secret_present = provided.is_some(),
                "Rejected job trigger with bad cron secret"
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "code": "UNAUTHORIZED",
                    "message": "Invalid or missing cron secret"
                })),
            )
                .into_response()
        }
    }
}
