//! Mock payment gateway for testing.
//!
//! Signs and verifies webhooks exactly like the real adapter and parses the
//! same body format, so handler tests exercise real payloads. Outbound calls
//! are recorded and answered locally. Supports:
//! - Call tracking for `initialize_payment`
//! - Error injection for the next outbound call

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{
    AccountInfo, Bank, ChargeHandle, GatewayError, InitializePaymentRequest, PaymentGateway,
    WebhookNotice,
};

use super::signature;
use super::webhook_types::parse_webhook;

#[derive(Default)]
struct MockState {
    initialized: Vec<InitializePaymentRequest>,
    next_error: Option<GatewayError>,
}

#[derive(Clone)]
pub struct MockGateway {
    secret: String,
    inner: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Signature a genuine gateway would send for `payload`.
    pub fn sign(&self, payload: &[u8]) -> String {
        signature::sign(&self.secret, payload)
    }

    /// Requests passed to `initialize_payment`, oldest first.
    pub async fn initialized(&self) -> Vec<InitializePaymentRequest> {
        self.inner.lock().await.initialized.clone()
    }

    /// Fail the next outbound call with `error`.
    pub async fn fail_next(&self, error: GatewayError) {
        self.inner.lock().await.next_error = Some(error);
    }

    async fn take_error(&self) -> Result<(), GatewayError> {
        match self.inner.lock().await.next_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize_payment(
        &self,
        request: InitializePaymentRequest,
    ) -> Result<ChargeHandle, GatewayError> {
        self.take_error().await?;
        let mut state = self.inner.lock().await;
        let reference = format!("mock_{}_{}", request.vendor_id, state.initialized.len() + 1);
        state.initialized.push(request);
        Ok(ChargeHandle {
            authorization_url: format!("https://checkout.mock/{}", reference),
            access_code: format!("ac_{}", reference),
            reference,
        })
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        signature::verify(&self.secret, payload, signature)
    }

    fn parse_webhook_event(&self, payload: &[u8]) -> Result<WebhookNotice, GatewayError> {
        parse_webhook(payload)
    }

    async fn resolve_bank_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> Result<AccountInfo, GatewayError> {
        self.take_error().await?;
        Ok(AccountInfo {
            account_number: account_number.to_string(),
            account_name: "MOCK ACCOUNT HOLDER".to_string(),
            bank_code: bank_code.to_string(),
        })
    }

    async fn list_banks(&self) -> Result<Vec<Bank>, GatewayError> {
        self.take_error().await?;
        Ok(vec![
            Bank {
                name: "Access Bank".to_string(),
                code: "044".to_string(),
                slug: Some("access-bank".to_string()),
            },
            Bank {
                name: "Guaranty Trust Bank".to_string(),
                code: "058".to_string(),
                slug: Some("guaranty-trust-bank".to_string()),
            },
        ])
    }
}
