//! In-memory dispatcher that records every send.
//!
//! Used by tests and by local runs without an email provider. Individual
//! vendors can be made to fail to exercise the retry path.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{Notification, NotificationKind};
use crate::domain::foundation::VendorId;
use crate::ports::{DispatchError, NotificationDispatcher, VendorInfo};

/// One recorded send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: NotificationKind,
    pub to: String,
    pub notification: Notification,
}

#[derive(Debug, Default)]
struct State {
    sent: Vec<SentEmail>,
    failing: HashSet<VendorId>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    state: Arc<RwLock<State>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentEmail> {
        self.state.read().await.sent.clone()
    }

    /// Make every send to `vendor_id` fail until `recover` is called.
    pub async fn fail_for(&self, vendor_id: VendorId) {
        self.state.write().await.failing.insert(vendor_id);
    }

    pub async fn recover(&self, vendor_id: &VendorId) {
        self.state.write().await.failing.remove(vendor_id);
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        kind: NotificationKind,
        vendor: &VendorInfo,
        notification: &Notification,
    ) -> Result<(), DispatchError> {
        let mut state = self.state.write().await;
        if state.failing.contains(&vendor.vendor_id) {
            return Err(DispatchError::Unavailable(format!(
                "simulated outage for {}",
                vendor.vendor_id
            )));
        }

        tracing::info!(
            vendor_id = %vendor.vendor_id,
            kind = %kind,
            to = %vendor.email,
            "Recorded notification"
        );
        state.sent.push(SentEmail {
            kind,
            to: vendor.email.clone(),
            notification: notification.clone(),
        });
        Ok(())
    }
}
