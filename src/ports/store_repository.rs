//! Store repository port.
//!
//! The single access path to subscription records. Every write is a
//! conditional update keyed by vendor id and the record's `version`, so a
//! webhook and a reconciliation tick racing on the same vendor cannot
//! silently overwrite each other: the loser sees `Conflict` and re-reads.
//!
//! # Example
//!
//! ```ignore
//! let record = repo.find_by_vendor(&vendor_id).await?.ok_or(...)?;
//! let transition = machine.apply(&record, &event, now);
//! match repo
//!     .update_subscription_fields(&vendor_id, record.version, &fields)
//!     .await?
//! {
//!     UpdateOutcome::Applied { version } => { /* durable */ }
//!     UpdateOutcome::Conflict => { /* re-read and retry */ }
//! }
//! ```

use async_trait::async_trait;

use crate::domain::billing::{SubscriptionFields, SubscriptionRecord, SubscriptionStatus};
use crate::domain::foundation::{DomainError, Timestamp, VendorId};

/// Result of a conditional subscription write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Write applied; the record now carries `version`.
    Applied { version: u64 },
    /// The stored version no longer matched the expected one.
    Conflict,
}

/// Filter for listing subscription records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionFilter {
    /// Only records in one of these statuses. Empty means any.
    pub statuses: Vec<SubscriptionStatus>,
    /// Only records whose period ended at or before this instant.
    pub period_end_before: Option<Timestamp>,
    /// Only records whose period ends after this instant.
    pub period_end_after: Option<Timestamp>,
    /// Only grace records whose grace ended before this instant.
    pub grace_end_before: Option<Timestamp>,
}

impl SubscriptionFilter {
    pub fn with_statuses(statuses: impl IntoIterator<Item = SubscriptionStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            ..Self::default()
        }
    }

    /// True when `record` passes every set criterion.
    pub fn matches(&self, record: &SubscriptionRecord) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&record.status()) {
            return false;
        }
        if let Some(before) = self.period_end_before {
            if record.current_period_end.is_after(&before) {
                return false;
            }
        }
        if let Some(after) = self.period_end_after {
            if !record.current_period_end.is_after(&after) {
                return false;
            }
        }
        if let Some(before) = self.grace_end_before {
            match record.grace_end() {
                Some(grace_end) if grace_end.is_before(&before) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Persistence port for per-vendor subscription records.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Find the record of a vendor's store.
    ///
    /// Returns `None` if the vendor has no store.
    async fn find_by_vendor(
        &self,
        vendor_id: &VendorId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// List records matching `filter`, ordered by vendor id.
    async fn list_subscriptions(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, DomainError>;

    /// Apply `fields` only if the stored version equals `expected_version`.
    ///
    /// # Errors
    ///
    /// - `VendorNotFound` if the vendor has no store
    /// - `DatabaseError` on persistence failure
    async fn update_subscription_fields(
        &self,
        vendor_id: &VendorId,
        expected_version: u64,
        fields: &SubscriptionFields,
    ) -> Result<UpdateOutcome, DomainError>;

    /// Create the record for a new store. Existing records are left untouched.
    async fn insert_subscription(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionState;
    use crate::domain::foundation::StoreId;

    fn record(state: SubscriptionState, period_end: Timestamp) -> SubscriptionRecord {
        let mut record = SubscriptionRecord::new(
            VendorId::new("v1").unwrap(),
            StoreId::new("s1").unwrap(),
            period_end,
        );
        record.state = state;
        record
    }

    #[test]
    fn empty_filter_matches_everything() {
        let now = Timestamp::now();
        assert!(SubscriptionFilter::default().matches(&record(SubscriptionState::Cancelled, now)));
    }

    #[test]
    fn status_filter_excludes_other_statuses() {
        let now = Timestamp::now();
        let filter = SubscriptionFilter::with_statuses([SubscriptionStatus::Active]);
        assert!(filter.matches(&record(SubscriptionState::Active, now)));
        assert!(!filter.matches(&record(SubscriptionState::Cancelled, now)));
    }

    #[test]
    fn grace_end_filter_requires_grace_state() {
        let now = Timestamp::now();
        let filter = SubscriptionFilter {
            grace_end_before: Some(now),
            ..SubscriptionFilter::default()
        };
        let expired = record(
            SubscriptionState::GracePeriod { grace_end: now.minus_days(1) },
            now.minus_days(6),
        );
        let running = record(
            SubscriptionState::GracePeriod { grace_end: now.add_days(1) },
            now.minus_days(4),
        );
        assert!(filter.matches(&expired));
        assert!(!filter.matches(&running));
        assert!(!filter.matches(&record(SubscriptionState::Active, now.minus_days(10))));
    }
}
