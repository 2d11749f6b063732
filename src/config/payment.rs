//! Payment configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment configuration (Paystack)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Paystack secret key; also keys the webhook HMAC
    pub secret_key: String,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for outbound gateway calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long the bank list is cached, in seconds
    #[serde(default = "default_bank_cache_ttl")]
    pub bank_cache_ttl_secs: u64,

    /// Where the checkout page sends the vendor after paying
    pub callback_url: Option<String>,
}

impl PaymentConfig {
    /// Check if using Paystack test mode
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Check if using Paystack live mode
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("sk_live_")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bank_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.bank_cache_ttl_secs)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__SECRET_KEY"));
        }
        if !self.is_test_mode() && !self.is_live_mode() {
            return Err(ValidationError::InvalidPaystackKey);
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(ValidationError::InvalidUrl("payment.base_url"));
        }
        if let Some(callback) = &self.callback_url {
            if !callback.starts_with("https://") && !callback.starts_with("http://") {
                return Err(ValidationError::InvalidUrl("payment.callback_url"));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            bank_cache_ttl_secs: default_bank_cache_ttl(),
            callback_url: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_bank_cache_ttl() -> u64 {
    3600
}
