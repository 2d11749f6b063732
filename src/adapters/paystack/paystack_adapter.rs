//! Paystack payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the Paystack REST API.
//!
//! # Security
//!
//! - Webhook signatures are HMAC-SHA512 of the raw body, compared in constant time
//! - The secret key is held in a `secrecy::SecretString`
//!
//! # Errors
//!
//! Every response comes in a `{status, message, data}` envelope. Failures are
//! normalized into `GatewayError`; callers never see the raw body.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::RwLock;

use crate::ports::{
    AccountInfo, Bank, ChargeHandle, GatewayError, InitializePaymentRequest, PaymentGateway,
    WebhookNotice,
};

use super::signature;
use super::webhook_types::{
    parse_webhook, PaystackBank, PaystackEnvelope, PaystackInitializeData, PaystackResolveData,
};

/// Paystack API configuration.
#[derive(Clone)]
pub struct PaystackConfig {
    secret_key: SecretString,
    api_base_url: String,
    request_timeout: Duration,
    bank_cache_ttl: Duration,
    bank_country: String,
}

impl PaystackConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            api_base_url: "https://api.paystack.co".to_string(),
            request_timeout: Duration::from_secs(15),
            bank_cache_ttl: Duration::from_secs(3600),
            bank_country: "nigeria".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_bank_cache_ttl(mut self, ttl: Duration) -> Self {
        self.bank_cache_ttl = ttl;
        self
    }
}

impl std::fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("bank_cache_ttl", &self.bank_cache_ttl)
            .finish_non_exhaustive()
    }
}

struct CachedBanks {
    banks: Vec<Bank>,
    fetched_at: Instant,
}

pub struct PaystackGateway {
    config: PaystackConfig,
    http_client: reqwest::Client,
    bank_cache: RwLock<Option<CachedBanks>>,
}

impl PaystackGateway {
    pub fn new(config: PaystackConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
            bank_cache: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Send a request and unwrap the `{status, message, data}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(operation, error = %e, "Paystack request failed");
                if e.is_timeout() {
                    GatewayError::timeout(format!("{} timed out", operation))
                } else {
                    GatewayError::network(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let envelope: Option<PaystackEnvelope<T>> = serde_json::from_str(&text).ok();
        let message = envelope
            .as_ref()
            .map(|env| env.message.clone())
            .unwrap_or_else(|| format!("HTTP {}", status));

        if !status.is_success() {
            tracing::error!(operation, status = status.as_u16(), message = %message, "Paystack returned an error");
            return Err(match status {
                reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                    GatewayError::authentication(message)
                }
                reqwest::StatusCode::NOT_FOUND => GatewayError::not_found(operation),
                s if s.is_server_error() || s == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    GatewayError::network(message)
                }
                _ => GatewayError::rejected(message),
            });
        }

        match envelope {
            Some(PaystackEnvelope { status: true, data: Some(data), .. }) => Ok(data),
            Some(PaystackEnvelope { status: false, message, .. }) => Err(GatewayError::rejected(message)),
            _ => Err(GatewayError::invalid_response(format!(
                "unexpected {} response body",
                operation
            ))),
        }
    }

    async fn cached_banks(&self) -> Option<Vec<Bank>> {
        let cache = self.bank_cache.read().await;
        cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.config.bank_cache_ttl)
            .map(|c| c.banks.clone())
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize_payment(
        &self,
        request: InitializePaymentRequest,
    ) -> Result<ChargeHandle, GatewayError> {
        let mut body = json!({
            "email": request.email,
            "amount": request.amount,
            "currency": request.currency,
            "metadata": { "vendor_id": request.vendor_id.as_str() },
        });
        if let Some(callback_url) = &request.callback_url {
            body["callback_url"] = json!(callback_url);
        }

        let data: PaystackInitializeData = self
            .call(
                "transaction.initialize",
                self.http_client.post(self.url("/transaction/initialize")).json(&body),
            )
            .await?;

        Ok(ChargeHandle {
            reference: data.reference,
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        signature::verify(self.config.secret_key.expose_secret(), payload, signature)
    }

    fn parse_webhook_event(&self, payload: &[u8]) -> Result<WebhookNotice, GatewayError> {
        parse_webhook(payload)
    }

    async fn resolve_bank_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> Result<AccountInfo, GatewayError> {
        let data: PaystackResolveData = self
            .call(
                "bank.resolve",
                self.http_client
                    .get(self.url("/bank/resolve"))
                    .query(&[("account_number", account_number), ("bank_code", bank_code)]),
            )
            .await?;

        Ok(AccountInfo {
            account_number: data.account_number,
            account_name: data.account_name,
            bank_code: bank_code.to_string(),
        })
    }

    async fn list_banks(&self) -> Result<Vec<Bank>, GatewayError> {
        if let Some(banks) = self.cached_banks().await {
            return Ok(banks);
        }

        let raw: Vec<PaystackBank> = self
            .call(
                "bank.list",
                self.http_client
                    .get(self.url("/bank"))
                    .query(&[("country", self.config.bank_country.as_str())]),
            )
            .await?;

        let banks: Vec<Bank> = raw
            .into_iter()
            .filter(|b| b.active)
            .map(|b| Bank {
                name: b.name,
                code: b.code,
                slug: b.slug,
            })
            .collect();

        tracing::debug!(count = banks.len(), "Refreshed bank list");
        *self.bank_cache.write().await = Some(CachedBanks {
            banks: banks.clone(),
            fetched_at: Instant::now(),
        });
        Ok(banks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::VendorId;
    use crate::ports::GatewayErrorCode;
    use mockito::Matcher;

    const SECRET: &str = "sk_test_abc";

    fn gateway(url: String) -> PaystackGateway {
        PaystackGateway::new(PaystackConfig::new(SECRET).with_base_url(url)).unwrap()
    }

    fn init_request() -> InitializePaymentRequest {
        InitializePaymentRequest {
            vendor_id: VendorId::new("vendor-1").unwrap(),
            amount: 500_000,
            email: "vendor@example.com".to_string(),
            currency: "NGN".to_string(),
            callback_url: None,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // initialize_payment
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn initialize_sends_vendor_metadata_and_parses_handle() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/transaction/initialize")
            .match_header("authorization", "Bearer sk_test_abc")
            .match_body(Matcher::PartialJsonString(
                r#"{"amount":500000,"metadata":{"vendor_id":"vendor-1"}}"#.to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"status":true,"message":"Authorization URL created","data":{"authorization_url":"https://checkout.paystack.com/abc","access_code":"abc","reference":"ref_1"}}"#,
            )
            .create_async()
            .await;

        let handle = gateway(server.url()).initialize_payment(init_request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(handle.reference, "ref_1");
        assert_eq!(handle.authorization_url, "https://checkout.paystack.com/abc");
    }

    #[tokio::test]
    async fn status_false_envelope_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/transaction/initialize")
            .with_status(200)
            .with_body(r#"{"status":false,"message":"Invalid amount"}"#)
            .create_async()
            .await;

        let err = gateway(server.url()).initialize_payment(init_request()).await.unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::Rejected);
        assert_eq!(err.message, "Invalid amount");
    }

    #[tokio::test]
    async fn bad_secret_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/transaction/initialize")
            .with_status(401)
            .with_body(r#"{"status":false,"message":"Invalid key"}"#)
            .create_async()
            .await;

        let err = gateway(server.url()).initialize_payment(init_request()).await.unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::Authentication);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/transaction/initialize")
            .with_status(503)
            .with_body("upstream down")
            .create_async()
            .await;

        let err = gateway(server.url()).initialize_payment(init_request()).await.unwrap_err();

        assert!(err.retryable);
    }

    #[tokio::test]
    async fn garbage_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/transaction/initialize")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = gateway(server.url()).initialize_payment(init_request()).await.unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::InvalidResponse);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Bank directory
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn resolves_account_name() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/bank/resolve")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("account_number".into(), "0123456789".into()),
                Matcher::UrlEncoded("bank_code".into(), "058".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"status":true,"message":"Account number resolved","data":{"account_number":"0123456789","account_name":"ADA LOVELACE","bank_id":9}}"#,
            )
            .create_async()
            .await;

        let info = gateway(server.url())
            .resolve_bank_account("058", "0123456789")
            .await
            .unwrap();

        assert_eq!(info.account_name, "ADA LOVELACE");
        assert_eq!(info.bank_code, "058");
    }

    #[tokio::test]
    async fn bank_list_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/bank")
            .match_query(Matcher::UrlEncoded("country".into(), "nigeria".into()))
            .with_status(200)
            .with_body(
                r#"{"status":true,"message":"Banks retrieved","data":[{"name":"Access Bank","code":"044","slug":"access-bank","active":true},{"name":"Old Bank","code":"999","active":false}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let gateway = gateway(server.url());
        let first = gateway.list_banks().await.unwrap();
        let second = gateway.list_banks().await.unwrap();

        mock.assert_async().await;
        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn expired_cache_is_refreshed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/bank")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":true,"message":"ok","data":[{"name":"Access Bank","code":"044"}]}"#)
            .expect(2)
            .create_async()
            .await;

        let gateway = PaystackGateway::new(
            PaystackConfig::new(SECRET)
                .with_base_url(server.url())
                .with_bank_cache_ttl(Duration::ZERO),
        )
        .unwrap();
        gateway.list_banks().await.unwrap();
        gateway.list_banks().await.unwrap();

        mock.assert_async().await;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Webhooks
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn verifies_signature_with_secret_key() {
        let gateway = PaystackGateway::new(PaystackConfig::new(SECRET)).unwrap();
        let payload = br#"{"event":"charge.success"}"#;

        assert!(gateway.verify_webhook_signature(payload, &signature::sign(SECRET, payload)));
        assert!(!gateway.verify_webhook_signature(payload, &signature::sign("other", payload)));
    }
}
