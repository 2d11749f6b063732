//! Notification ledger port.
//!
//! The ledger holds one row per `(vendor_id, kind, period_key)`. Reserving a
//! row is the only way to earn the right to dispatch; callers that see
//! `AlreadyRecorded` must not send.
//!
//! # Lifecycle
//!
//! ```text
//! reserve ──► Reserved (sending) ──► dispatch ──► mark_sent (sent)
//!    │                                   │
//!    │                                   └─ failure ─► mark_failed (pending)
//!    │                                                      │
//!    │                  claim_retries (sending) ◄───────────┘
//!    └─► AlreadyRecorded (another caller owns it)
//! ```
//!
//! A row in `sending` belongs to whoever reserved or claimed it. Retries
//! only ever take rows through `claim_retries`, which moves them back to
//! `sending` in the same atomic step that selects them, so a notification
//! still being dispatched by a webhook is never picked up by the job.

use async_trait::async_trait;

use crate::domain::billing::{Notification, NotificationKey, NotificationRecord};
use crate::domain::foundation::{DomainError, Timestamp};

/// Result of trying to reserve a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Row created; this caller dispatches.
    Reserved,
    /// A row for this key already exists.
    AlreadyRecorded,
}

#[async_trait]
pub trait NotificationLedger: Send + Sync {
    /// Insert a row in `sending` unless one exists for the same key.
    async fn reserve(
        &self,
        notification: &Notification,
        now: Timestamp,
    ) -> Result<ReserveOutcome, DomainError>;

    /// Record a successful send.
    async fn mark_sent(&self, key: &NotificationKey, now: Timestamp) -> Result<(), DomainError>;

    /// Record a failed send attempt and release the row as `pending`.
    async fn mark_failed(
        &self,
        key: &NotificationKey,
        error: &str,
        now: Timestamp,
    ) -> Result<(), DomainError>;

    /// Claim up to `limit` rows due for another attempt, oldest first.
    ///
    /// Due means below `max_attempts` and either `pending`, or `sending`
    /// with a claim older than `stale_before`. Claimed rows are moved to
    /// `sending` stamped with `now` before this returns; concurrent
    /// callers never receive the same row.
    async fn claim_retries(
        &self,
        max_attempts: u32,
        limit: usize,
        stale_before: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<NotificationRecord>, DomainError>;

    /// Fetch a single row.
    async fn find(&self, key: &NotificationKey) -> Result<Option<NotificationRecord>, DomainError>;
}
