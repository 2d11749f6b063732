//! In-memory store repository for tests and local runs.
//!
//! Mirrors the conditional-write semantics of the Postgres adapter: an
//! update only lands when the caller's expected version matches. Tests can
//! inject version conflicts and write failures to drive retry paths.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{StoreVisibility, SubscriptionFields, SubscriptionRecord};
use crate::domain::foundation::{DomainError, ErrorCode, VendorId};
use crate::ports::{StoreRepository, SubscriptionFilter, UpdateOutcome};

#[derive(Debug, Clone)]
struct StoredSubscription {
    record: SubscriptionRecord,
    visibility: StoreVisibility,
}

/// Store repository backed by a map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStoreRepository {
    stores: Arc<RwLock<BTreeMap<VendorId, StoredSubscription>>>,
    failing_vendors: Arc<RwLock<HashSet<VendorId>>>,
    injected_conflicts: Arc<AtomicUsize>,
}

impl InMemoryStoreRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current visibility of a vendor's store.
    pub async fn visibility(&self, vendor_id: &VendorId) -> Option<StoreVisibility> {
        self.stores.read().await.get(vendor_id).map(|s| s.visibility)
    }

    /// Make the next `count` updates report `Conflict` after bumping the
    /// stored version, as if another writer got there first.
    pub fn inject_conflicts(&self, count: usize) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Make every update for `vendor_id` fail with a database error.
    pub async fn fail_updates_for(&self, vendor_id: VendorId) {
        self.failing_vendors.write().await.insert(vendor_id);
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl StoreRepository for InMemoryStoreRepository {
    async fn find_by_vendor(
        &self,
        vendor_id: &VendorId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self
            .stores
            .read()
            .await
            .get(vendor_id)
            .map(|s| s.record.clone()))
    }

    async fn list_subscriptions(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        Ok(self
            .stores
            .read()
            .await
            .values()
            .filter(|s| filter.matches(&s.record))
            .map(|s| s.record.clone())
            .collect())
    }

    async fn update_subscription_fields(
        &self,
        vendor_id: &VendorId,
        expected_version: u64,
        fields: &SubscriptionFields,
    ) -> Result<UpdateOutcome, DomainError> {
        if self.failing_vendors.read().await.contains(vendor_id) {
            return Err(DomainError::database(format!(
                "write failed for vendor {}",
                vendor_id
            )));
        }

        let mut stores = self.stores.write().await;
        let stored = stores.get_mut(vendor_id).ok_or_else(|| {
            DomainError::new(ErrorCode::VendorNotFound, "Vendor has no store")
                .with_detail("vendor_id", vendor_id.as_str())
        })?;

        if self.take_injected_conflict() {
            stored.record.version += 1;
            return Ok(UpdateOutcome::Conflict);
        }
        if stored.record.version != expected_version {
            return Ok(UpdateOutcome::Conflict);
        }

        stored.record.state = fields.state;
        stored.record.current_period_end = fields.current_period_end;
        stored.record.processed_payment_refs = fields.processed_payment_refs.clone();
        stored.record.last_processed_payment_ref = fields.last_processed_payment_ref.clone();
        stored.record.last_tick_date = fields.last_tick_date;
        stored.record.version += 1;
        if let Some(visibility) = fields.visibility {
            stored.visibility = visibility;
        }

        Ok(UpdateOutcome::Applied {
            version: stored.record.version,
        })
    }

    async fn insert_subscription(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        self.stores
            .write()
            .await
            .entry(record.vendor_id.clone())
            .or_insert_with(|| StoredSubscription {
                record: record.clone(),
                visibility: StoreVisibility::Visible,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionState;
    use crate::domain::foundation::{StoreId, Timestamp};

    fn record(vendor: &str) -> SubscriptionRecord {
        SubscriptionRecord::new(
            VendorId::new(vendor).unwrap(),
            StoreId::new(format!("store-{}", vendor)).unwrap(),
            Timestamp::now(),
        )
    }

    #[tokio::test]
    async fn update_with_matching_version_bumps_version() {
        let repo = InMemoryStoreRepository::new();
        let r = record("v1");
        repo.insert_subscription(&r).await.unwrap();

        let fields = SubscriptionFields::from_record(&r, Some(StoreVisibility::Hidden));
        let outcome = repo
            .update_subscription_fields(&r.vendor_id, 0, &fields)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Applied { version: 1 });
        assert_eq!(repo.visibility(&r.vendor_id).await, Some(StoreVisibility::Hidden));
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let repo = InMemoryStoreRepository::new();
        let r = record("v1");
        repo.insert_subscription(&r).await.unwrap();
        let fields = SubscriptionFields::from_record(&r, None);
        repo.update_subscription_fields(&r.vendor_id, 0, &fields)
            .await
            .unwrap();

        let mut stale = fields.clone();
        stale.state = SubscriptionState::Cancelled;
        let outcome = repo
            .update_subscription_fields(&r.vendor_id, 0, &stale)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Conflict);
        let stored = repo.find_by_vendor(&r.vendor_id).await.unwrap().unwrap();
        assert_eq!(stored.state, SubscriptionState::Active);
    }

    #[tokio::test]
    async fn update_for_unknown_vendor_is_not_found() {
        let repo = InMemoryStoreRepository::new();
        let r = record("ghost");
        let err = repo
            .update_subscription_fields(&r.vendor_id, 0, &SubscriptionFields::from_record(&r, None))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VendorNotFound);
    }

    #[tokio::test]
    async fn insert_does_not_overwrite_existing_record() {
        let repo = InMemoryStoreRepository::new();
        let mut r = record("v1");
        repo.insert_subscription(&r).await.unwrap();
        r.state = SubscriptionState::Cancelled;
        repo.insert_subscription(&r).await.unwrap();

        let stored = repo.find_by_vendor(&r.vendor_id).await.unwrap().unwrap();
        assert_eq!(stored.state, SubscriptionState::Active);
    }

    #[tokio::test]
    async fn injected_conflict_is_consumed_once() {
        let repo = InMemoryStoreRepository::new();
        let r = record("v1");
        repo.insert_subscription(&r).await.unwrap();
        repo.inject_conflicts(1);
        let fields = SubscriptionFields::from_record(&r, None);

        let first = repo.update_subscription_fields(&r.vendor_id, 0, &fields).await.unwrap();
        let second = repo.update_subscription_fields(&r.vendor_id, 1, &fields).await.unwrap();

        assert_eq!(first, UpdateOutcome::Conflict);
        assert_eq!(second, UpdateOutcome::Applied { version: 2 });
    }
}
