//! NotificationService - ledger-guarded delivery of billing notifications.
//!
//! Every send is preceded by a ledger reservation on
//! `(vendor_id, kind, period_key)`. Losing the reservation means someone
//! else already owns that notification, so nothing is sent. Failed sends
//! are released as pending and `retry_pending` claims them back before
//! sending again.

use std::sync::Arc;

use chrono::Duration;

use serde::Serialize;

use crate::domain::billing::{Notification, NotificationKey};
use crate::domain::foundation::{Timestamp, VendorId};
use crate::ports::{NotificationDispatcher, NotificationLedger, ReserveOutcome, UserRepository};

/// A notification that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFailure {
    pub vendor_id: VendorId,
    pub kind: String,
    pub message: String,
}

/// Counts from one delivery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    /// Already recorded by an earlier or concurrent caller.
    pub skipped: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn merge(&mut self, other: DeliveryReport) {
        self.sent += other.sent;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// How long a reservation may sit in `sending` before a retry assumes its
/// holder died and takes it over.
const CLAIM_TIMEOUT_MINUTES: i64 = 30;

enum Delivery {
    Sent,
    Skipped,
}

pub struct NotificationService {
    ledger: Arc<dyn NotificationLedger>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    users: Arc<dyn UserRepository>,
    max_attempts: u32,
}

impl NotificationService {
    pub fn new(
        ledger: Arc<dyn NotificationLedger>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        users: Arc<dyn UserRepository>,
        max_attempts: u32,
    ) -> Self {
        Self {
            ledger,
            dispatcher,
            users,
            max_attempts,
        }
    }

    /// Reserve and send each notification.
    pub async fn deliver(&self, notifications: &[Notification], now: Timestamp) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for notification in notifications {
            match self.deliver_one(notification, now).await {
                Ok(Delivery::Sent) => report.sent += 1,
                Ok(Delivery::Skipped) => report.skipped += 1,
                Err(message) => report.failures.push(failure(&notification.key, message)),
            }
        }
        report
    }

    /// Claim and resend ledger entries whose earlier attempts failed.
    ///
    /// Reservations another caller is still dispatching are left alone
    /// unless their claim has gone stale.
    pub async fn retry_pending(&self, limit: usize, now: Timestamp) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let stale_before =
            Timestamp::from_datetime(*now.as_datetime() - Duration::minutes(CLAIM_TIMEOUT_MINUTES));
        let claimed = match self
            .ledger
            .claim_retries(self.max_attempts, limit, stale_before, now)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim pending notifications");
                return report;
            }
        };

        for entry in claimed {
            tracing::info!(
                vendor_id = %entry.key().vendor_id,
                kind = %entry.key().kind,
                attempt = entry.attempts + 1,
                "Retrying notification"
            );
            match self.dispatch(&entry.notification, now).await {
                Ok(()) => report.sent += 1,
                Err(message) => report.failures.push(failure(entry.key(), message)),
            }
        }
        report
    }

    /// True when every notification already has a ledger row.
    ///
    /// A lookup error counts as not recorded; delivering again is safe
    /// because reservation dedupes.
    pub async fn all_recorded(&self, notifications: &[Notification]) -> bool {
        for notification in notifications {
            match self.ledger.find(&notification.key).await {
                Ok(Some(_)) => {}
                Ok(None) => return false,
                Err(e) => {
                    tracing::warn!(
                        vendor_id = %notification.key.vendor_id,
                        error = %e,
                        "Failed to look up notification"
                    );
                    return false;
                }
            }
        }
        true
    }

    async fn deliver_one(
        &self,
        notification: &Notification,
        now: Timestamp,
    ) -> Result<Delivery, String> {
        match self.ledger.reserve(notification, now).await {
            Ok(ReserveOutcome::AlreadyRecorded) => {
                tracing::debug!(
                    vendor_id = %notification.key.vendor_id,
                    kind = %notification.key.kind,
                    period_key = %notification.key.period_key,
                    "Notification already recorded, skipping"
                );
                Ok(Delivery::Skipped)
            }
            Ok(ReserveOutcome::Reserved) => self.dispatch(notification, now).await.map(|_| Delivery::Sent),
            Err(e) => Err(format!("ledger reservation failed: {}", e)),
        }
    }

    /// Send a reserved or claimed notification and record the outcome.
    async fn dispatch(&self, notification: &Notification, now: Timestamp) -> Result<(), String> {
        let key = &notification.key;
        let result = match self.users.find_vendor(&key.vendor_id).await {
            Ok(Some(vendor)) => self
                .dispatcher
                .send(key.kind, &vendor, notification)
                .await
                .map_err(|e| e.to_string()),
            Ok(None) => Err(format!("vendor {} not found", key.vendor_id)),
            Err(e) => Err(format!("vendor lookup failed: {}", e)),
        };

        match result {
            Ok(()) => {
                if let Err(e) = self.ledger.mark_sent(key, now).await {
                    // Email went out; a stale pending row only risks one resend.
                    tracing::warn!(
                        vendor_id = %key.vendor_id,
                        kind = %key.kind,
                        error = %e,
                        "Sent notification but failed to mark it sent"
                    );
                }
                tracing::info!(
                    vendor_id = %key.vendor_id,
                    kind = %key.kind,
                    period_key = %key.period_key,
                    "Notification sent"
                );
                Ok(())
            }
            Err(message) => {
                tracing::warn!(
                    vendor_id = %key.vendor_id,
                    kind = %key.kind,
                    error = %message,
                    "Notification dispatch failed"
                );
                if let Err(e) = self.ledger.mark_failed(key, &message, now).await {
                    tracing::error!(vendor_id = %key.vendor_id, error = %e, "Failed to record dispatch failure");
                }
                Err(message)
            }
        }
    }
}

fn failure(key: &NotificationKey, message: String) -> DeliveryFailure {
    DeliveryFailure {
        vendor_id: key.vendor_id.clone(),
        kind: key.kind.to_string(),
        message,
    }
}
