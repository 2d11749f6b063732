//! In-memory notification ledger.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{DeliveryStatus, Notification, NotificationKey, NotificationRecord};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{NotificationLedger, ReserveOutcome};

/// Ledger backed by an ordered map keyed on the dedupe key.
///
/// Reservation and retry claims happen under the write lock, so concurrent
/// callers see exactly one owner per row.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationLedger {
    entries: Arc<RwLock<BTreeMap<NotificationKey, NotificationRecord>>>,
}

impl InMemoryNotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row, in key order.
    pub async fn all(&self) -> Vec<NotificationRecord> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Rows already marked sent.
    pub async fn sent(&self) -> Vec<NotificationRecord> {
        self.entries
            .read()
            .await
            .values()
            .filter(|r| r.status == DeliveryStatus::Sent)
            .cloned()
            .collect()
    }
}

fn missing(key: &NotificationKey) -> DomainError {
    DomainError::new(ErrorCode::InternalError, "Notification not reserved")
        .with_detail("vendor_id", key.vendor_id.as_str())
        .with_detail("kind", key.kind.as_str())
}

#[async_trait]
impl NotificationLedger for InMemoryNotificationLedger {
    async fn reserve(
        &self,
        notification: &Notification,
        now: Timestamp,
    ) -> Result<ReserveOutcome, DomainError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&notification.key) {
            return Ok(ReserveOutcome::AlreadyRecorded);
        }
        entries.insert(
            notification.key.clone(),
            NotificationRecord::reserved(notification.clone(), now),
        );
        Ok(ReserveOutcome::Reserved)
    }

    async fn mark_sent(&self, key: &NotificationKey, now: Timestamp) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(key).ok_or_else(|| missing(key))?;
        entry.status = DeliveryStatus::Sent;
        entry.attempts += 1;
        entry.last_error = None;
        entry.updated_at = now;
        entry.sent_at = Some(now);
        Ok(())
    }

    async fn mark_failed(
        &self,
        key: &NotificationKey,
        error: &str,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(key)
            .filter(|r| r.status == DeliveryStatus::Sending)
            .ok_or_else(|| missing(key))?;
        entry.status = DeliveryStatus::Pending;
        entry.attempts += 1;
        entry.last_error = Some(error.to_string());
        entry.updated_at = now;
        Ok(())
    }

    async fn claim_retries(
        &self,
        max_attempts: u32,
        limit: usize,
        stale_before: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<NotificationRecord>, DomainError> {
        let mut entries = self.entries.write().await;
        let mut due: Vec<(Timestamp, NotificationKey)> = entries
            .values()
            .filter(|r| r.is_claimable(max_attempts, stale_before))
            .map(|r| (r.created_at, r.key().clone()))
            .collect();
        due.sort();
        due.truncate(limit);

        let mut claimed = Vec::with_capacity(due.len());
        for (_, key) in due {
            if let Some(entry) = entries.get_mut(&key) {
                entry.status = DeliveryStatus::Sending;
                entry.updated_at = now;
                claimed.push(entry.clone());
            }
        }
        Ok(claimed)
    }

    async fn find(&self, key: &NotificationKey) -> Result<Option<NotificationRecord>, DomainError> {
        Ok(self.entries.read().await.get(key).cloned())
    }
}
