//! HandlePaymentWebhookHandler - Command handler for payment gateway callbacks.
//!
//! Order of operations:
//!
//! 1. Verify the signature over the raw body. Nothing is parsed or touched
//!    before this passes.
//! 2. Parse the event. Types billing does not act on are acknowledged.
//! 3. Apply the payment to the vendor's record (idempotent per reference).
//! 4. Once the write is durable, deliver notifications. Delivery failures
//!    stay pending in the ledger; they never fail the webhook.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PaymentEventKind, TransitionOutcome};
use crate::domain::foundation::{PaymentReference, Timestamp, VendorId};
use crate::ports::{PaymentGateway, WebhookNotice};

use super::{NotificationService, SubscriptionUpdater};

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw webhook payload.
    pub payload: Vec<u8>,
    /// Signature header, if the request carried one.
    pub signature: Option<String>,
    pub received_at: Timestamp,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlePaymentWebhookResult {
    /// Payment applied to the subscription.
    Applied {
        vendor_id: VendorId,
        reference: PaymentReference,
        outcome: TransitionOutcome,
        notifications_sent: usize,
    },
    /// Reference already applied, failed charge, or dispute: nothing changed.
    NoChange {
        vendor_id: VendorId,
        reference: PaymentReference,
        kind: PaymentEventKind,
    },
    /// Event type billing does not handle.
    Ignored { event: String },
}

pub struct HandlePaymentWebhookHandler {
    gateway: Arc<dyn PaymentGateway>,
    updater: Arc<SubscriptionUpdater>,
    notifications: Arc<NotificationService>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        updater: Arc<SubscriptionUpdater>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            gateway,
            updater,
            notifications,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, BillingError> {
        // 1. Authenticate before reading any business field
        let signature = cmd
            .signature
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BillingError::auth("missing webhook signature"))?;
        if !self.gateway.verify_webhook_signature(&cmd.payload, signature) {
            tracing::warn!(payload_len = cmd.payload.len(), "Rejected webhook with invalid signature");
            return Err(BillingError::auth("invalid webhook signature"));
        }

        // 2. Parse
        let event = match self
            .gateway
            .parse_webhook_event(&cmd.payload)
            .map_err(|e| BillingError::validation("payload", e.message))?
        {
            WebhookNotice::Payment(event) => event,
            WebhookNotice::Ignored { event } => {
                tracing::debug!(event = %event, "Ignoring webhook event");
                return Ok(HandlePaymentWebhookResult::Ignored { event });
            }
        };

        tracing::info!(
            vendor_id = %event.vendor_id,
            reference = %event.reference,
            kind = ?event.kind,
            amount = event.amount,
            "Processing payment webhook"
        );

        // 3. Apply to the record
        let applied = self
            .updater
            .apply(&event.vendor_id, &event.to_billing_event(), cmd.received_at)
            .await?;

        if !applied.persisted {
            if event.kind != PaymentEventKind::Succeeded {
                tracing::warn!(
                    vendor_id = %event.vendor_id,
                    reference = %event.reference,
                    kind = ?event.kind,
                    "Payment not successful, subscription left unchanged"
                );
            } else {
                tracing::info!(
                    vendor_id = %event.vendor_id,
                    reference = %event.reference,
                    "Payment reference already applied"
                );
            }
            return Ok(HandlePaymentWebhookResult::NoChange {
                vendor_id: event.vendor_id,
                reference: event.reference,
                kind: event.kind,
            });
        }

        // 4. Notify; failures are retried from the ledger
        let delivery = self
            .notifications
            .deliver(&applied.transition.notifications, cmd.received_at)
            .await;
        for failure in &delivery.failures {
            tracing::warn!(
                vendor_id = %failure.vendor_id,
                kind = %failure.kind,
                error = %failure.message,
                "Webhook notification deferred to ledger retry"
            );
        }

        Ok(HandlePaymentWebhookResult::Applied {
            vendor_id: event.vendor_id,
            reference: event.reference,
            outcome: applied.transition.outcome,
            notifications_sent: delivery.sent,
        })
    }
}
