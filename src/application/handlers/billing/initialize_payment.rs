//! InitializeSubscriptionPaymentHandler - starts a subscription charge.
//!
//! The charge carries the vendor id in its metadata so the webhook can
//! correlate it. Nothing here touches subscription state; only the webhook
//! for the completed charge does.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SubscriptionStatus};
use crate::domain::foundation::VendorId;
use crate::ports::{ChargeHandle, InitializePaymentRequest, PaymentGateway, StoreRepository, UserRepository};

/// Command to start a subscription charge.
#[derive(Debug, Clone)]
pub struct InitializeSubscriptionPaymentCommand {
    pub vendor_id: VendorId,
    /// Overrides the configured callback URL.
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeSubscriptionPaymentResult {
    pub charge: ChargeHandle,
    pub amount: i64,
    pub currency: String,
}

pub struct InitializeSubscriptionPaymentHandler {
    gateway: Arc<dyn PaymentGateway>,
    users: Arc<dyn UserRepository>,
    stores: Arc<dyn StoreRepository>,
    amount: i64,
    currency: String,
    callback_url: Option<String>,
}

impl InitializeSubscriptionPaymentHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        users: Arc<dyn UserRepository>,
        stores: Arc<dyn StoreRepository>,
        amount: i64,
        currency: impl Into<String>,
        callback_url: Option<String>,
    ) -> Self {
        Self {
            gateway,
            users,
            stores,
            amount,
            currency: currency.into(),
            callback_url,
        }
    }

    pub async fn handle(
        &self,
        cmd: InitializeSubscriptionPaymentCommand,
    ) -> Result<InitializeSubscriptionPaymentResult, BillingError> {
        // 1. Vendor must exist and still be billable
        let record = self
            .stores
            .find_by_vendor(&cmd.vendor_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(cmd.vendor_id.clone()))?;
        if record.status() == SubscriptionStatus::Cancelled {
            return Err(BillingError::validation(
                "vendor_id",
                "subscription is cancelled and cannot be renewed",
            ));
        }

        // 2. Contact email for the charge
        let vendor = self
            .users
            .find_vendor(&cmd.vendor_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(cmd.vendor_id.clone()))?;

        // 3. Start the charge
        let charge = self
            .gateway
            .initialize_payment(InitializePaymentRequest {
                vendor_id: cmd.vendor_id.clone(),
                amount: self.amount,
                email: vendor.email,
                currency: self.currency.clone(),
                callback_url: cmd.callback_url.or_else(|| self.callback_url.clone()),
            })
            .await?;

        tracing::info!(
            vendor_id = %cmd.vendor_id,
            reference = %charge.reference,
            amount = self.amount,
            "Subscription charge initialized"
        );

        Ok(InitializeSubscriptionPaymentResult {
            charge,
            amount: self.amount,
            currency: self.currency.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::{InMemoryStoreRepository, InMemoryUserRepository};
    use crate::adapters::paystack::MockGateway;
    use crate::domain::billing::{SubscriptionRecord, SubscriptionState};
    use crate::domain::foundation::{StoreId, Timestamp};
    use crate::ports::{GatewayError, VendorInfo};

    fn vendor_id() -> VendorId {
        VendorId::new("vendor-1").unwrap()
    }

    async fn handler(state: SubscriptionState) -> (InitializeSubscriptionPaymentHandler, MockGateway, InMemoryStoreRepository) {
        let gateway = MockGateway::new("secret");
        let stores = InMemoryStoreRepository::new();
        let mut record = SubscriptionRecord::new(vendor_id(), StoreId::new("store-1").unwrap(), Timestamp::now());
        record.state = state;
        stores.insert_subscription(&record).await.unwrap();
        let users = InMemoryUserRepository::new();
        users
            .insert(VendorInfo {
                vendor_id: vendor_id(),
                store_id: StoreId::new("store-1").unwrap(),
                email: "vendor@example.com".to_string(),
                display_name: "Ada".to_string(),
                store_name: "Ada's Fabrics".to_string(),
            })
            .await;
        let handler = InitializeSubscriptionPaymentHandler::new(
            Arc::new(gateway.clone()),
            Arc::new(users),
            Arc::new(stores.clone()),
            500_000,
            "NGN",
            Some("https://shop.example.com/billing/callback".to_string()),
        );
        (handler, gateway, stores)
    }

    fn command() -> InitializeSubscriptionPaymentCommand {
        InitializeSubscriptionPaymentCommand {
            vendor_id: vendor_id(),
            callback_url: None,
        }
    }

    #[tokio::test]
    async fn starts_charge_with_vendor_metadata() {
        let (handler, gateway, _) = handler(SubscriptionState::Active).await;

        let result = handler.handle(command()).await.unwrap();

        assert_eq!(result.amount, 500_000);
        let requests = gateway.initialized().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].vendor_id, vendor_id());
        assert_eq!(requests[0].email, "vendor@example.com");
        assert_eq!(
            requests[0].callback_url.as_deref(),
            Some("https://shop.example.com/billing/callback")
        );
    }

    #[tokio::test]
    async fn does_not_touch_subscription_state() {
        let (handler, _, stores) = handler(SubscriptionState::Active).await;

        handler.handle(command()).await.unwrap();

        let stored = stores.find_by_vendor(&vendor_id()).await.unwrap().unwrap();
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn cancelled_vendor_is_rejected() {
        let (handler, gateway, _) = handler(SubscriptionState::Cancelled).await;

        let err = handler.handle(command()).await.unwrap_err();

        assert!(matches!(err, BillingError::Validation { .. }));
        assert!(gateway.initialized().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_vendor_is_not_found() {
        let (handler, _, _) = handler(SubscriptionState::Active).await;
        let err = handler
            .handle(InitializeSubscriptionPaymentCommand {
                vendor_id: VendorId::new("ghost").unwrap(),
                callback_url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::NotFound(_)));
    }

    #[tokio::test]
    async fn gateway_timeout_is_transient() {
        let (handler, gateway, _) = handler(SubscriptionState::Active).await;
        gateway.fail_next(GatewayError::timeout("upstream timed out")).await;

        let err = handler.handle(command()).await.unwrap_err();

        assert!(matches!(err, BillingError::TransientGateway(_)));
    }
}
