//! Sender identity and Resend credentials for billing emails.

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Resend key, `re_` prefix.
    pub resend_api_key: String,

    #[serde(default = "default_from_email")]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Linked from every billing email as the place to pay or check status.
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,
}

impl EmailConfig {
    /// `From` header value, e.g. `Vendor Billing <billing@vendors.example.com>`.
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name.trim(), self.from_email.trim())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.resend_api_key.trim().is_empty() {
            return Err(ValidationError::MissingRequired("EMAIL__RESEND_API_KEY"));
        }
        if !self.resend_api_key.starts_with("re_") {
            return Err(ValidationError::InvalidResendKey);
        }
        if !is_plain_address(self.from_email.trim()) {
            return Err(ValidationError::InvalidFromEmail);
        }
        if self.from_name.contains(['<', '>']) {
            return Err(ValidationError::InvalidFromEmail);
        }
        if !(self.dashboard_url.starts_with("https://") || self.dashboard_url.starts_with("http://")) {
            return Err(ValidationError::InvalidUrl("email.dashboard_url"));
        }
        Ok(())
    }
}

/// One `@` with something on each side, and no header syntax.
fn is_plain_address(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.contains('@')
                && !address.contains(['<', '>', ' '])
        }
        None => false,
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            dashboard_url: default_dashboard_url(),
        }
    }
}

fn default_from_email() -> String {
    "billing@vendors.example.com".to_string()
}

fn default_from_name() -> String {
    "Vendor Billing".to_string()
}

fn default_dashboard_url() -> String {
    "http://localhost:3000/vendor/dashboard".to_string()
}
