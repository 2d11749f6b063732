//! Notification dispatcher port.
//!
//! Sends vendor-facing billing emails. Dispatchers do no deduplication of
//! their own; the ledger decides whether a send happens at all.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::billing::{Notification, NotificationKind};

use super::VendorInfo;

/// Errors from a notification send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Provider rejected the message (bad address, invalid payload).
    #[error("Notification rejected: {0}")]
    Rejected(String),

    /// Provider unreachable or rate limited.
    #[error("Notification provider unavailable: {0}")]
    Unavailable(String),
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Unavailable(_))
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Send one notification to a vendor.
    async fn send(
        &self,
        kind: NotificationKind,
        vendor: &VendorInfo,
        notification: &Notification,
    ) -> Result<(), DispatchError>;
}
