//! SubscriptionUpdater - read, apply, conditional write, retry on conflict.
//!
//! Both the webhook processor and the daily job funnel every record change
//! through here. A `Conflict` from the store means another writer moved
//! the record since we read it; the event is re-applied to the fresh copy
//! rather than overwriting the other writer's effect.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, BillingEvent, BillingStateMachine, SubscriptionFields, SubscriptionRecord,
    SubscriptionStatus, Transition,
};
use crate::domain::foundation::{Timestamp, VendorId};
use crate::ports::{StoreRepository, UpdateOutcome};

/// A transition together with what happened when persisting it.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    pub previous_status: SubscriptionStatus,
    /// Record as stored after the write (or as read, when nothing changed).
    pub transition: Transition,
    /// False when the transition was a no-op and nothing was written.
    pub persisted: bool,
    /// Conflicts resolved before the write landed.
    pub conflicts: u32,
}

pub struct SubscriptionUpdater {
    stores: Arc<dyn StoreRepository>,
    machine: BillingStateMachine,
    max_conflict_retries: u32,
}

impl SubscriptionUpdater {
    pub fn new(
        stores: Arc<dyn StoreRepository>,
        machine: BillingStateMachine,
        max_conflict_retries: u32,
    ) -> Self {
        Self {
            stores,
            machine,
            max_conflict_retries,
        }
    }

    pub fn machine(&self) -> &BillingStateMachine {
        &self.machine
    }

    /// Load the vendor's record and apply `event`.
    pub async fn apply(
        &self,
        vendor_id: &VendorId,
        event: &BillingEvent,
        now: Timestamp,
    ) -> Result<AppliedTransition, BillingError> {
        let record = self.load(vendor_id).await?;
        self.apply_to(record, event, now).await
    }

    /// Apply `event` starting from an already loaded record.
    pub async fn apply_to(
        &self,
        record: SubscriptionRecord,
        event: &BillingEvent,
        now: Timestamp,
    ) -> Result<AppliedTransition, BillingError> {
        let vendor_id = record.vendor_id.clone();
        let mut current = record;
        let mut conflicts = 0;

        loop {
            let mut transition = self.machine.apply(&current, event, now);
            if !transition.requires_write(&current) {
                return Ok(AppliedTransition {
                    previous_status: current.status(),
                    transition,
                    persisted: false,
                    conflicts,
                });
            }

            let fields = SubscriptionFields::from_record(&transition.record, transition.visibility);
            match self
                .stores
                .update_subscription_fields(&vendor_id, current.version, &fields)
                .await?
            {
                UpdateOutcome::Applied { version } => {
                    transition.record.version = version;
                    tracing::debug!(
                        vendor_id = %vendor_id,
                        event = event.name(),
                        from = %current.status(),
                        to = %transition.record.status(),
                        version,
                        "Subscription updated"
                    );
                    return Ok(AppliedTransition {
                        previous_status: current.status(),
                        transition,
                        persisted: true,
                        conflicts,
                    });
                }
                UpdateOutcome::Conflict => {
                    conflicts += 1;
                    if conflicts > self.max_conflict_retries {
                        tracing::warn!(
                            vendor_id = %vendor_id,
                            event = event.name(),
                            attempts = conflicts,
                            "Giving up after repeated write conflicts"
                        );
                        return Err(BillingError::persistence(format!(
                            "write conflict on vendor {} not resolved after {} attempts",
                            vendor_id, conflicts
                        )));
                    }
                    tracing::debug!(
                        vendor_id = %vendor_id,
                        attempt = conflicts,
                        "Write conflict, re-reading subscription"
                    );
                    current = self.load(&vendor_id).await?;
                }
            }
        }
    }

    async fn load(&self, vendor_id: &VendorId) -> Result<SubscriptionRecord, BillingError> {
        self.stores
            .find_by_vendor(vendor_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(vendor_id.clone()))
    }
}
