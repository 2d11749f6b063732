//! Resend email dispatcher.
//!
//! Posts rendered billing emails to the Resend `/emails` endpoint. Client
//! errors (4xx other than 429) are reported as `Rejected`; timeouts, 429 and
//! 5xx are `Unavailable` and stay pending in the ledger for the next run.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::domain::billing::{Notification, NotificationKind};
use crate::ports::{DispatchError, NotificationDispatcher, VendorInfo};

use super::templates::render;

/// Resend API configuration.
#[derive(Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    from: String,
    dashboard_url: String,
    api_base_url: String,
    timeout: Duration,
}

impl ResendConfig {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>, dashboard_url: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            from: from.into(),
            dashboard_url: dashboard_url.into(),
            api_base_url: "https://api.resend.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ResendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendConfig")
            .field("from", &self.from)
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    tags: Vec<EmailTag<'a>>,
}

#[derive(Debug, Serialize)]
struct EmailTag<'a> {
    name: &'a str,
    value: &'a str,
}

pub struct ResendDispatcher {
    config: ResendConfig,
    http_client: reqwest::Client,
}

impl ResendDispatcher {
    pub fn new(config: ResendConfig) -> Result<Self, DispatchError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DispatchError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http_client })
    }
}

#[async_trait]
impl NotificationDispatcher for ResendDispatcher {
    async fn send(
        &self,
        kind: NotificationKind,
        vendor: &VendorInfo,
        notification: &Notification,
    ) -> Result<(), DispatchError> {
        let email = render(kind, vendor, notification, &self.config.dashboard_url);
        let body = SendEmailRequest {
            from: &self.config.from,
            to: vec![vendor.email.as_str()],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
            tags: vec![EmailTag {
                name: "kind",
                value: kind.as_str(),
            }],
        };

        let url = format!("{}/emails", self.config.api_base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(vendor_id = %vendor.vendor_id, kind = %kind, "Resend accepted email");
            return Ok(());
        }

        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(
            vendor_id = %vendor.vendor_id,
            kind = %kind,
            status = status.as_u16(),
            error = %error_text,
            "Resend send failed"
        );
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(DispatchError::Unavailable(format!("Resend returned {}", status)))
        } else {
            Err(DispatchError::Rejected(format!("Resend returned {}: {}", status, error_text)))
        }
    }
}
