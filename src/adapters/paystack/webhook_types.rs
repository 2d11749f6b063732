//! Paystack wire types: webhook bodies and API envelopes.

use serde::Deserialize;

use crate::domain::billing::{PaymentEvent, PaymentEventKind};
use crate::domain::foundation::{PaymentReference, Timestamp, VendorId};
use crate::ports::{GatewayError, WebhookNotice};

/// Top-level webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackWebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// The `data` object of a charge event.
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackCharge {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<PaystackMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaystackMetadata {
    #[serde(default)]
    pub vendor_id: Option<String>,
}

/// Standard API response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackEnvelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaystackInitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaystackResolveData {
    pub account_number: String,
    pub account_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaystackBank {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

fn event_kind(event: &str) -> Option<PaymentEventKind> {
    match event {
        "charge.success" => Some(PaymentEventKind::Succeeded),
        "charge.failed" => Some(PaymentEventKind::Failed),
        "charge.dispute.create" => Some(PaymentEventKind::Disputed),
        _ => None,
    }
}

/// Parse a verified webhook body.
///
/// Unhandled event types are `Ignored`. Charge events must carry a
/// reference, a positive amount and `metadata.vendor_id`.
pub fn parse_webhook(payload: &[u8]) -> Result<WebhookNotice, GatewayError> {
    let event: PaystackWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| GatewayError::rejected(format!("Invalid JSON: {}", e)))?;

    let kind = match event_kind(&event.event) {
        Some(kind) => kind,
        None => return Ok(WebhookNotice::Ignored { event: event.event }),
    };

    let charge: PaystackCharge = serde_json::from_value(event.data)
        .map_err(|e| GatewayError::rejected(format!("Invalid charge data: {}", e)))?;

    let reference = charge
        .reference
        .as_deref()
        .ok_or_else(|| GatewayError::rejected("missing data.reference"))
        .and_then(|r| PaymentReference::new(r).map_err(|e| GatewayError::rejected(e.to_string())))?;

    let vendor_id = charge
        .metadata
        .and_then(|m| m.vendor_id)
        .ok_or_else(|| GatewayError::rejected("missing data.metadata.vendor_id"))
        .and_then(|v| VendorId::new(v).map_err(|e| GatewayError::rejected(e.to_string())))?;

    let amount = charge
        .amount
        .ok_or_else(|| GatewayError::rejected("missing data.amount"))?;

    let occurred_at = charge
        .paid_at
        .as_deref()
        .or(charge.created_at.as_deref())
        .and_then(Timestamp::parse_rfc3339)
        .unwrap_or_else(Timestamp::now);

    let payment = PaymentEvent::new(reference, vendor_id, kind, amount, occurred_at)
        .map_err(|e| GatewayError::rejected(e.to_string()))?;

    Ok(WebhookNotice::Payment(payment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> Vec<u8> {
        value.to_string().into_bytes()
    }

    #[test]
    fn parses_charge_success() {
        let payload = body(json!({
            "event": "charge.success",
            "data": {
                "reference": "T123",
                "amount": 500000,
                "paid_at": "2026-06-01T10:00:00Z",
                "metadata": { "vendor_id": "vendor-1" }
            }
        }));

        let notice = parse_webhook(&payload).unwrap();

        match notice {
            WebhookNotice::Payment(event) => {
                assert_eq!(event.reference.as_str(), "T123");
                assert_eq!(event.vendor_id.as_str(), "vendor-1");
                assert_eq!(event.kind, PaymentEventKind::Succeeded);
                assert_eq!(event.amount, 500000);
                assert_eq!(
                    event.occurred_at,
                    Timestamp::parse_rfc3339("2026-06-01T10:00:00Z").unwrap()
                );
            }
            other => panic!("unexpected notice {:?}", other),
        }
    }

    #[test]
    fn falls_back_to_created_at() {
        let payload = body(json!({
            "event": "charge.dispute.create",
            "data": {
                "reference": "T9",
                "amount": 100,
                "created_at": "2026-05-30T08:00:00Z",
                "metadata": { "vendor_id": "vendor-1" }
            }
        }));

        let WebhookNotice::Payment(event) = parse_webhook(&payload).unwrap() else {
            panic!("expected payment");
        };
        assert_eq!(event.kind, PaymentEventKind::Disputed);
        assert_eq!(
            event.occurred_at,
            Timestamp::parse_rfc3339("2026-05-30T08:00:00Z").unwrap()
        );
    }

    #[test]
    fn unhandled_event_is_ignored() {
        let payload = body(json!({ "event": "transfer.success", "data": {} }));
        assert_eq!(
            parse_webhook(&payload).unwrap(),
            WebhookNotice::Ignored { event: "transfer.success".to_string() }
        );
    }

    #[test]
    fn missing_vendor_is_rejected() {
        let payload = body(json!({
            "event": "charge.success",
            "data": { "reference": "T1", "amount": 100 }
        }));
        let err = parse_webhook(&payload).unwrap_err();
        assert!(err.message.contains("vendor_id"));
    }

    #[test]
    fn missing_reference_is_rejected() {
        let payload = body(json!({
            "event": "charge.success",
            "data": { "amount": 100, "metadata": { "vendor_id": "v" } }
        }));
        assert!(parse_webhook(&payload).is_err());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let payload = body(json!({
            "event": "charge.failed",
            "data": { "reference": "T1", "amount": 0, "metadata": { "vendor_id": "v" } }
        }));
        assert!(parse_webhook(&payload).is_err());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(parse_webhook(b"{not json").is_err());
    }
}
