//! Per-vendor subscription record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PaymentReference, StoreId, Timestamp, VendorId};

use super::{SubscriptionState, SubscriptionStatus};

/// Payment references remembered per record, about two years of monthly
/// cycles. Gateways redeliver within days, so older references never come
/// back through the webhook.
pub const MAX_REMEMBERED_PAYMENT_REFS: usize = 24;

/// Billing record of one vendor's store.
///
/// # Invariants
///
/// - `vendor_id` and `store_id` never change
/// - `current_period_end` only moves forward, and only when a payment
///   reference not in `processed_payment_refs` is applied
/// - `processed_payment_refs` is oldest first and holds at most
///   [`MAX_REMEMBERED_PAYMENT_REFS`] entries
/// - `version` is owned by the store; the state machine never touches it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub vendor_id: VendorId,
    pub store_id: StoreId,
    pub state: SubscriptionState,
    pub current_period_end: Timestamp,
    pub processed_payment_refs: Vec<PaymentReference>,
    pub last_processed_payment_ref: Option<PaymentReference>,
    pub last_tick_date: Option<NaiveDate>,
    /// Optimistic concurrency token, bumped by every successful write.
    pub version: u64,
}

impl SubscriptionRecord {
    /// Record for a freshly created store.
    ///
    /// The period end starts at `now`; the first cleared payment moves it
    /// one cycle ahead.
    pub fn new(vendor_id: VendorId, store_id: StoreId, now: Timestamp) -> Self {
        Self {
            vendor_id,
            store_id,
            state: SubscriptionState::Active,
            current_period_end: now,
            processed_payment_refs: Vec::new(),
            last_processed_payment_ref: None,
            last_tick_date: None,
            version: 0,
        }
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.state.status()
    }

    pub fn grace_end(&self) -> Option<Timestamp> {
        self.state.grace_end()
    }

    pub fn frozen_at(&self) -> Option<Timestamp> {
        self.state.frozen_at()
    }

    pub fn has_processed(&self, reference: &PaymentReference) -> bool {
        self.processed_payment_refs.contains(reference)
    }

    /// Record `reference` as applied, forgetting the oldest references
    /// beyond [`MAX_REMEMBERED_PAYMENT_REFS`].
    pub fn remember_payment(&mut self, reference: PaymentReference) {
        if !self.has_processed(&reference) {
            self.processed_payment_refs.push(reference.clone());
        }
        let excess = self
            .processed_payment_refs
            .len()
            .saturating_sub(MAX_REMEMBERED_PAYMENT_REFS);
        self.processed_payment_refs.drain(..excess);
        self.last_processed_payment_ref = Some(reference);
    }

    /// True once the daily job has ticked this record on `date`.
    pub fn ticked_on(&self, date: NaiveDate) -> bool {
        self.last_tick_date == Some(date)
    }
}

/// Fields written back by a conditional subscription update.
///
/// Identity and version are excluded: the former is immutable, the latter
/// is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFields {
    pub state: SubscriptionState,
    pub current_period_end: Timestamp,
    pub processed_payment_refs: Vec<PaymentReference>,
    pub last_processed_payment_ref: Option<PaymentReference>,
    pub last_tick_date: Option<NaiveDate>,
    /// Store visibility change to apply in the same write, if any.
    pub visibility: Option<StoreVisibility>,
}

impl SubscriptionFields {
    pub fn from_record(record: &SubscriptionRecord, visibility: Option<StoreVisibility>) -> Self {
        Self {
            state: record.state,
            current_period_end: record.current_period_end,
            processed_payment_refs: record.processed_payment_refs.clone(),
            last_processed_payment_ref: record.last_processed_payment_ref.clone(),
            last_tick_date: record.last_tick_date,
            visibility,
        }
    }
}

/// Buyer-facing visibility of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreVisibility {
    Visible,
    Hidden,
}

impl StoreVisibility {
    pub fn is_visible(&self) -> bool {
        matches!(self, StoreVisibility::Visible)
    }
}
