//! AdminActionHandler - operator actions on subscriptions.
//!
//! The three batch actions are scoped runs of the daily job. Per-vendor
//! overrides go through the same updater as webhooks and ticks, so they
//! respect the conditional-write discipline too.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{
    BillingError, BillingEvent, PaymentReceipt, SubscriptionRecord, SubscriptionStatus,
    TransitionOutcome,
};
use crate::domain::foundation::{PaymentReference, Timestamp, VendorId};
use crate::ports::{StoreRepository, SubscriptionFilter};

use super::{JobReport, JobScope, NotificationService, RunDailySubscriptionJobHandler, SubscriptionUpdater};

/// Operator action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    SendExpiryWarnings,
    SendGracePeriodWarnings,
    ProcessExpiredGracePeriods,
    FreezeVendor { vendor_id: VendorId },
    ReactivateVendor { vendor_id: VendorId, reference: PaymentReference },
    CancelVendor { vendor_id: VendorId },
    GetVendorStatus { vendor_id: VendorId },
    GetAllSubscriptionStatus,
}

impl AdminAction {
    pub fn name(&self) -> &'static str {
        match self {
            AdminAction::SendExpiryWarnings => "send_expiry_warnings",
            AdminAction::SendGracePeriodWarnings => "send_grace_period_warnings",
            AdminAction::ProcessExpiredGracePeriods => "process_expired_grace_periods",
            AdminAction::FreezeVendor { .. } => "freeze_vendor",
            AdminAction::ReactivateVendor { .. } => "reactivate_vendor",
            AdminAction::CancelVendor { .. } => "cancel_vendor",
            AdminAction::GetVendorStatus { .. } => "get_vendor_status",
            AdminAction::GetAllSubscriptionStatus => "get_all_subscription_status",
        }
    }
}

/// Read model of one vendor's subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSnapshot {
    pub vendor_id: VendorId,
    pub store_id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Timestamp,
    pub grace_end: Option<Timestamp>,
    pub frozen_at: Option<Timestamp>,
    pub last_payment_reference: Option<PaymentReference>,
    pub last_tick_date: Option<String>,
    pub days_remaining: i64,
}

impl SubscriptionSnapshot {
    pub fn of(record: &SubscriptionRecord, now: Timestamp) -> Self {
        Self {
            vendor_id: record.vendor_id.clone(),
            store_id: record.store_id.to_string(),
            status: record.status(),
            current_period_end: record.current_period_end,
            grace_end: record.grace_end(),
            frozen_at: record.frozen_at(),
            last_payment_reference: record.last_processed_payment_ref.clone(),
            last_tick_date: record.last_tick_date.map(|d| d.to_string()),
            days_remaining: record.current_period_end.duration_since(&now).num_days().max(0),
        }
    }
}

/// Counts of subscriptions per status plus every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOverview {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub subscriptions: Vec<SubscriptionSnapshot>,
}

/// Result of an admin action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminActionResult {
    Job(JobReport),
    Vendor {
        snapshot: SubscriptionSnapshot,
        outcome: Option<TransitionOutcome>,
        notifications_sent: usize,
    },
    Overview(SubscriptionOverview),
}

pub struct AdminActionHandler {
    job: Arc<RunDailySubscriptionJobHandler>,
    updater: Arc<SubscriptionUpdater>,
    notifications: Arc<NotificationService>,
    stores: Arc<dyn StoreRepository>,
    /// Amount recorded for admin reactivations, in minor units.
    subscription_amount: i64,
}

impl AdminActionHandler {
    pub fn new(
        job: Arc<RunDailySubscriptionJobHandler>,
        updater: Arc<SubscriptionUpdater>,
        notifications: Arc<NotificationService>,
        stores: Arc<dyn StoreRepository>,
        subscription_amount: i64,
    ) -> Self {
        Self {
            job,
            updater,
            notifications,
            stores,
            subscription_amount,
        }
    }

    pub async fn handle(
        &self,
        action: AdminAction,
        now: Timestamp,
    ) -> Result<AdminActionResult, BillingError> {
        tracing::info!(action = action.name(), "Admin subscription action");

        match action {
            AdminAction::SendExpiryWarnings => self.scoped(JobScope::ExpiryWarnings, now).await,
            AdminAction::SendGracePeriodWarnings => self.scoped(JobScope::GraceWarnings, now).await,
            AdminAction::ProcessExpiredGracePeriods => {
                self.scoped(JobScope::ExpiredGracePeriods, now).await
            }
            AdminAction::FreezeVendor { vendor_id } => {
                self.override_vendor(&vendor_id, BillingEvent::Freeze, now).await
            }
            AdminAction::ReactivateVendor { vendor_id, reference } => {
                let receipt = PaymentReceipt {
                    reference,
                    amount: self.subscription_amount,
                };
                self.override_vendor(&vendor_id, BillingEvent::Reactivate(receipt), now)
                    .await
            }
            AdminAction::CancelVendor { vendor_id } => {
                self.override_vendor(&vendor_id, BillingEvent::Cancel, now).await
            }
            AdminAction::GetVendorStatus { vendor_id } => {
                let record = self
                    .stores
                    .find_by_vendor(&vendor_id)
                    .await?
                    .ok_or(BillingError::NotFound(vendor_id))?;
                Ok(AdminActionResult::Vendor {
                    snapshot: SubscriptionSnapshot::of(&record, now),
                    outcome: None,
                    notifications_sent: 0,
                })
            }
            AdminAction::GetAllSubscriptionStatus => {
                let records = self
                    .stores
                    .list_subscriptions(&SubscriptionFilter::default())
                    .await?;
                let mut by_status = BTreeMap::new();
                for record in &records {
                    *by_status.entry(record.status().to_string()).or_insert(0) += 1;
                }
                Ok(AdminActionResult::Overview(SubscriptionOverview {
                    total: records.len(),
                    by_status,
                    subscriptions: records.iter().map(|r| SubscriptionSnapshot::of(r, now)).collect(),
                }))
            }
        }
    }

    async fn scoped(&self, scope: JobScope, now: Timestamp) -> Result<AdminActionResult, BillingError> {
        self.job.run(scope, now).await.map(AdminActionResult::Job)
    }

    async fn override_vendor(
        &self,
        vendor_id: &VendorId,
        event: BillingEvent,
        now: Timestamp,
    ) -> Result<AdminActionResult, BillingError> {
        let applied = self.updater.apply(vendor_id, &event, now).await?;
        let delivery = self
            .notifications
            .deliver(&applied.transition.notifications, now)
            .await;

        tracing::info!(
            vendor_id = %vendor_id,
            event = event.name(),
            from = %applied.previous_status,
            to = %applied.transition.record.status(),
            persisted = applied.persisted,
            "Admin override applied"
        );

        Ok(AdminActionResult::Vendor {
            snapshot: SubscriptionSnapshot::of(&applied.transition.record, now),
            outcome: Some(applied.transition.outcome),
            notifications_sent: delivery.sent,
        })
    }
}
