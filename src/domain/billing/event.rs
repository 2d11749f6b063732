//! Events the billing state machine reacts to.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PaymentReference, Timestamp, ValidationError, VendorId};

/// Outcome reported by the payment gateway for a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
    Succeeded,
    Failed,
    Disputed,
}

/// Charge outcome derived from a verified webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub reference: PaymentReference,
    pub vendor_id: VendorId,
    pub kind: PaymentEventKind,
    /// Amount in minor currency units.
    pub amount: i64,
    pub occurred_at: Timestamp,
}

impl PaymentEvent {
    pub fn new(
        reference: PaymentReference,
        vendor_id: VendorId,
        kind: PaymentEventKind,
        amount: i64,
        occurred_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        if amount <= 0 {
            return Err(ValidationError::out_of_range("amount", 1, i64::MAX, amount));
        }
        Ok(Self {
            reference,
            vendor_id,
            kind,
            amount,
            occurred_at,
        })
    }

    /// The state machine event this charge outcome maps to.
    pub fn to_billing_event(&self) -> BillingEvent {
        let receipt = PaymentReceipt {
            reference: self.reference.clone(),
            amount: self.amount,
        };
        match self.kind {
            PaymentEventKind::Succeeded => BillingEvent::PaymentSucceeded(receipt),
            PaymentEventKind::Failed => BillingEvent::PaymentFailed(receipt),
            PaymentEventKind::Disputed => BillingEvent::PaymentDisputed(receipt),
        }
    }
}

/// Minimal payment facts the state machine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: PaymentReference,
    pub amount: i64,
}

/// Input to `BillingStateMachine::apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    PaymentSucceeded(PaymentReceipt),
    PaymentFailed(PaymentReceipt),
    PaymentDisputed(PaymentReceipt),
    /// Time-driven evaluation from the daily job.
    Tick,
    /// Admin override.
    Freeze,
    /// Admin reactivation backed by a confirmed payment.
    Reactivate(PaymentReceipt),
    /// Admin cancellation.
    Cancel,
}

impl BillingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BillingEvent::PaymentSucceeded(_) => "payment_succeeded",
            BillingEvent::PaymentFailed(_) => "payment_failed",
            BillingEvent::PaymentDisputed(_) => "payment_disputed",
            BillingEvent::Tick => "tick",
            BillingEvent::Freeze => "freeze",
            BillingEvent::Reactivate(_) => "reactivate",
            BillingEvent::Cancel => "cancel",
        }
    }
}
