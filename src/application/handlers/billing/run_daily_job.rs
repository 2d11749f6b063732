//! RunDailySubscriptionJobHandler - batch reconciliation of subscriptions.
//!
//! One logical run per trigger: take the single-flight lock, retry ledger
//! entries left pending by earlier failures, then tick every selected
//! record through a bounded worker pool. A vendor that fails is recorded in
//! the report and the run moves on.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::domain::billing::{
    BillingError, BillingEvent, BillingPolicy, SubscriptionRecord, SubscriptionStatus,
    TransitionOutcome,
};
use crate::domain::foundation::{Timestamp, VendorId};
use crate::ports::{JobLock, StoreRepository, SubscriptionFilter};

use super::{DeliveryReport, NotificationService, SubscriptionUpdater};

/// Name of the lock shared by every reconciliation run.
pub const SUBSCRIPTION_JOB_LOCK: &str = "subscription-job";

/// Which records a run evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobScope {
    /// The daily job: every non-terminal record, less those already
    /// settled by an earlier run today.
    All,
    /// Active records inside the expiry warning window.
    ExpiryWarnings,
    /// Active records whose period has ended.
    GraceWarnings,
    /// Grace records whose grace period has ended.
    ExpiredGracePeriods,
}

impl JobScope {
    fn filter(&self, now: Timestamp, policy: &BillingPolicy) -> SubscriptionFilter {
        match self {
            JobScope::All => SubscriptionFilter::with_statuses(SubscriptionStatus::non_terminal()),
            JobScope::ExpiryWarnings => SubscriptionFilter {
                statuses: vec![SubscriptionStatus::Active],
                period_end_after: Some(now),
                period_end_before: Some(now.add_days(policy.warning_days)),
                ..SubscriptionFilter::default()
            },
            JobScope::GraceWarnings => SubscriptionFilter {
                statuses: vec![SubscriptionStatus::Active],
                period_end_before: Some(now),
                ..SubscriptionFilter::default()
            },
            JobScope::ExpiredGracePeriods => SubscriptionFilter {
                statuses: vec![SubscriptionStatus::GracePeriod],
                grace_end_before: Some(now),
                ..SubscriptionFilter::default()
            },
        }
    }
}

/// Per-vendor failure captured during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    pub vendor_id: VendorId,
    /// `persist`, `notify` or `notify_retry`.
    pub stage: String,
    pub message: String,
}

/// Aggregate result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub scope: JobScope,
    pub started_at: Timestamp,
    pub processed: usize,
    pub warned: usize,
    pub grace_entered: usize,
    pub frozen: usize,
    /// Records already ticked today with nothing left to deliver.
    pub skipped: usize,
    pub notifications_sent: usize,
    /// Pending ledger entries delivered at the start of the run.
    pub retried: usize,
    pub errors: Vec<JobError>,
}

impl JobReport {
    fn new(scope: JobScope, started_at: Timestamp) -> Self {
        Self {
            scope,
            started_at,
            processed: 0,
            warned: 0,
            grace_entered: 0,
            frozen: 0,
            skipped: 0,
            notifications_sent: 0,
            retried: 0,
            errors: Vec::new(),
        }
    }
}

/// Tunables of the batch driver.
#[derive(Debug, Clone, Copy)]
pub struct JobSettings {
    pub worker_concurrency: usize,
    pub lock_ttl: Duration,
    /// Max pending ledger entries retried per run.
    pub retry_batch: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            worker_concurrency: 8,
            lock_ttl: Duration::from_secs(15 * 60),
            retry_batch: 500,
        }
    }
}

struct RecordResult {
    vendor_id: VendorId,
    outcome: Result<(TransitionOutcome, usize), BillingError>,
    delivery: DeliveryReport,
}

pub struct RunDailySubscriptionJobHandler {
    stores: Arc<dyn StoreRepository>,
    updater: Arc<SubscriptionUpdater>,
    notifications: Arc<NotificationService>,
    lock: Arc<dyn JobLock>,
    settings: JobSettings,
}

impl RunDailySubscriptionJobHandler {
    pub fn new(
        stores: Arc<dyn StoreRepository>,
        updater: Arc<SubscriptionUpdater>,
        notifications: Arc<NotificationService>,
        lock: Arc<dyn JobLock>,
        settings: JobSettings,
    ) -> Self {
        Self {
            stores,
            updater,
            notifications,
            lock,
            settings,
        }
    }

    /// Run one reconciliation pass over `scope`.
    ///
    /// # Errors
    ///
    /// - `JobAlreadyRunning` if another run holds the lock
    /// - `Persistence` if the lock or the record listing is unavailable
    ///
    /// Per-vendor failures never error the run; they land in `errors`.
    pub async fn run(&self, scope: JobScope, now: Timestamp) -> Result<JobReport, BillingError> {
        let lease = self
            .lock
            .try_acquire(SUBSCRIPTION_JOB_LOCK, self.settings.lock_ttl)
            .await?
            .ok_or(BillingError::JobAlreadyRunning)?;

        tracing::info!(scope = ?scope, "Subscription job started");
        let result = self.run_locked(scope, now).await;

        if let Err(e) = self.lock.release(&lease).await {
            tracing::warn!(error = %e, "Failed to release subscription job lock");
        }

        match &result {
            Ok(report) => tracing::info!(
                scope = ?scope,
                processed = report.processed,
                warned = report.warned,
                grace_entered = report.grace_entered,
                frozen = report.frozen,
                skipped = report.skipped,
                notifications_sent = report.notifications_sent,
                retried = report.retried,
                errors = report.errors.len(),
                "Subscription job finished"
            ),
            Err(e) => tracing::error!(scope = ?scope, error = %e, "Subscription job aborted"),
        }
        result
    }

    async fn run_locked(&self, scope: JobScope, now: Timestamp) -> Result<JobReport, BillingError> {
        let mut report = JobReport::new(scope, now);

        let retried = self
            .notifications
            .retry_pending(self.settings.retry_batch, now)
            .await;
        report.retried = retried.sent;
        report.errors.extend(retried.failures.into_iter().map(|f| JobError {
            vendor_id: f.vendor_id,
            stage: "notify_retry".to_string(),
            message: format!("{}: {}", f.kind, f.message),
        }));

        let filter = scope.filter(now, self.updater.machine().policy());
        let records = self.stores.list_subscriptions(&filter).await?;

        let today = now.date();
        let (mut due, ticked): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| scope != JobScope::All || !r.ticked_on(today));

        // A record ticked earlier today is only skipped when the earlier
        // run finished its work, so a rerun resumes whatever a failure cut
        // short.
        let checked: Vec<(SubscriptionRecord, bool)> = stream::iter(ticked)
            .map(|record| async move {
                let settled = self.is_settled(&record, now).await;
                (record, settled)
            })
            .buffer_unordered(self.settings.worker_concurrency.max(1))
            .collect()
            .await;
        for (record, settled) in checked {
            if settled {
                report.skipped += 1;
            } else {
                tracing::info!(vendor_id = %record.vendor_id, "Resuming record ticked earlier today");
                due.push(record);
            }
        }

        let results: Vec<RecordResult> = stream::iter(due)
            .map(|record| self.process_record(record, now))
            .buffer_unordered(self.settings.worker_concurrency.max(1))
            .collect()
            .await;

        for result in results {
            match result.outcome {
                Ok((outcome, emitted)) => {
                    report.processed += 1;
                    let newly_notified = result.delivery.skipped < emitted;
                    match outcome {
                        TransitionOutcome::ExpiryWarned | TransitionOutcome::GraceReminded
                            if newly_notified =>
                        {
                            report.warned += 1
                        }
                        TransitionOutcome::GraceEntered => {
                            report.grace_entered += 1;
                            if newly_notified {
                                report.warned += 1;
                            }
                        }
                        TransitionOutcome::Frozen => report.frozen += 1,
                        _ => {}
                    }
                }
                Err(e) => report.errors.push(JobError {
                    vendor_id: result.vendor_id.clone(),
                    stage: "persist".to_string(),
                    message: e.to_string(),
                }),
            }

            report.notifications_sent += result.delivery.sent;
            report.errors.extend(result.delivery.failures.into_iter().map(|f| JobError {
                vendor_id: f.vendor_id,
                stage: "notify".to_string(),
                message: format!("{}: {}", f.kind, f.message),
            }));
        }

        Ok(report)
    }

    /// True when ticking `record` again would write nothing and every
    /// notification it implies is already in the ledger.
    async fn is_settled(&self, record: &SubscriptionRecord, now: Timestamp) -> bool {
        let transition = self.updater.machine().apply(record, &BillingEvent::Tick, now);
        !transition.requires_write(record)
            && self.notifications.all_recorded(&transition.notifications).await
    }

    async fn process_record(&self, record: SubscriptionRecord, now: Timestamp) -> RecordResult {
        let vendor_id = record.vendor_id.clone();
        match self.updater.apply_to(record, &BillingEvent::Tick, now).await {
            Ok(applied) => {
                let emitted = applied.transition.notifications.len();
                let delivery = self
                    .notifications
                    .deliver(&applied.transition.notifications, now)
                    .await;
                RecordResult {
                    vendor_id,
                    outcome: Ok((applied.transition.outcome, emitted)),
                    delivery,
                }
            }
            Err(e) => {
                tracing::warn!(vendor_id = %vendor_id, error = %e, "Subscription tick failed");
                RecordResult {
                    vendor_id,
                    outcome: Err(e),
                    delivery: DeliveryReport::default(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::email::RecordingDispatcher;
    use crate::adapters::in_memory::{
        InMemoryNotificationLedger, InMemoryStoreRepository, InMemoryUserRepository,
    };
    use crate::adapters::job_lock::InMemoryJobLock;
    use crate::domain::billing::{
        BillingStateMachine, Notification, NotificationKey, NotificationKind, NotificationRecord,
        SubscriptionState,
    };
    use crate::domain::foundation::{DomainError, StoreId};
    use crate::ports::{NotificationLedger, ReserveOutcome, VendorInfo};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn now() -> Timestamp {
        Timestamp::parse_rfc3339("2026-06-01T02:00:00Z").unwrap()
    }

    struct Fixture {
        stores: InMemoryStoreRepository,
        dispatcher: RecordingDispatcher,
        lock: InMemoryJobLock,
        job: RunDailySubscriptionJobHandler,
    }

    /// Ledger whose next `failures` reservations error out.
    struct FlakyLedger {
        inner: InMemoryNotificationLedger,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl NotificationLedger for FlakyLedger {
        async fn reserve(
            &self,
            notification: &Notification,
            now: Timestamp,
        ) -> Result<ReserveOutcome, DomainError> {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(DomainError::database("connection reset"));
            }
            self.inner.reserve(notification, now).await
        }

        async fn mark_sent(&self, key: &NotificationKey, now: Timestamp) -> Result<(), DomainError> {
            self.inner.mark_sent(key, now).await
        }

        async fn mark_failed(
            &self,
            key: &NotificationKey,
            error: &str,
            now: Timestamp,
        ) -> Result<(), DomainError> {
            self.inner.mark_failed(key, error, now).await
        }

        async fn claim_retries(
            &self,
            max_attempts: u32,
            limit: usize,
            stale_before: Timestamp,
            now: Timestamp,
        ) -> Result<Vec<NotificationRecord>, DomainError> {
            self.inner.claim_retries(max_attempts, limit, stale_before, now).await
        }

        async fn find(&self, key: &NotificationKey) -> Result<Option<NotificationRecord>, DomainError> {
            self.inner.find(key).await
        }
    }

    async fn fixture(records: Vec<(&str, SubscriptionState, Timestamp)>) -> Fixture {
        fixture_with_ledger(records, Arc::new(InMemoryNotificationLedger::new())).await
    }

    async fn fixture_with_ledger(
        records: Vec<(&str, SubscriptionState, Timestamp)>,
        ledger: Arc<dyn NotificationLedger>,
    ) -> Fixture {
        let stores = InMemoryStoreRepository::new();
        let users = InMemoryUserRepository::new();
        for (vendor, state, period_end) in records {
            let vendor_id = VendorId::new(vendor).unwrap();
            let store_id = StoreId::new(format!("store-{}", vendor)).unwrap();
            let mut record = SubscriptionRecord::new(vendor_id.clone(), store_id.clone(), period_end);
            record.state = state;
            stores.insert_subscription(&record).await.unwrap();
            users
                .insert(VendorInfo {
                    vendor_id,
                    store_id,
                    email: format!("{}@example.com", vendor),
                    display_name: vendor.to_string(),
                    store_name: format!("{} store", vendor),
                })
                .await;
        }

        let dispatcher = RecordingDispatcher::new();
        let lock = InMemoryJobLock::new();
        let updater = Arc::new(SubscriptionUpdater::new(
            Arc::new(stores.clone()),
            BillingStateMachine::new(BillingPolicy::default()),
            3,
        ));
        let notifications = Arc::new(NotificationService::new(
            ledger,
            Arc::new(dispatcher.clone()),
            Arc::new(users),
            3,
        ));
        let job = RunDailySubscriptionJobHandler::new(
            Arc::new(stores.clone()),
            updater,
            notifications,
            Arc::new(lock.clone()),
            JobSettings::default(),
        );
        Fixture {
            stores,
            dispatcher,
            lock,
            job,
        }
    }

    #[tokio::test]
    async fn ticks_each_state_once() {
        let f = fixture(vec![
            ("expired", SubscriptionState::Active, now().minus_days(1)),
            ("expiring", SubscriptionState::Active, now().add_days(2)),
            ("healthy", SubscriptionState::Active, now().add_days(20)),
            (
                "grace-over",
                SubscriptionState::GracePeriod { grace_end: now().minus_days(1) },
                now().minus_days(6),
            ),
        ])
        .await;

        let report = f.job.run(JobScope::All, now()).await.unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.grace_entered, 1);
        assert_eq!(report.frozen, 1);
        assert_eq!(report.warned, 2);
        assert_eq!(report.notifications_sent, 3);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn second_run_same_day_sends_nothing() {
        let f = fixture(vec![
            ("expired", SubscriptionState::Active, now().minus_days(1)),
            ("expiring", SubscriptionState::Active, now().add_days(2)),
        ])
        .await;

        f.job.run(JobScope::All, now()).await.unwrap();
        let second = f.job.run(JobScope::All, now()).await.unwrap();

        assert_eq!(second.notifications_sent, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(f.dispatcher.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn rerun_delivers_freeze_notice_lost_to_ledger_outage() {
        let ledger = Arc::new(FlakyLedger {
            inner: InMemoryNotificationLedger::new(),
            failures: AtomicUsize::new(1),
        });
        let f = fixture_with_ledger(
            vec![(
                "grace-over",
                SubscriptionState::GracePeriod { grace_end: now().minus_days(1) },
                now().minus_days(6),
            )],
            ledger.clone(),
        )
        .await;

        let first = f.job.run(JobScope::All, now()).await.unwrap();
        assert_eq!(first.frozen, 1);
        assert_eq!(first.errors.len(), 1);
        assert_eq!(first.errors[0].stage, "notify");
        assert!(f.dispatcher.sent().await.is_empty());

        let rerun = f.job.run(JobScope::All, now()).await.unwrap();
        assert_eq!(rerun.skipped, 0);
        assert_eq!(rerun.processed, 1);
        assert_eq!(rerun.notifications_sent, 1);
        assert!(rerun.errors.is_empty());

        let next_day = f.job.run(JobScope::All, now().add_days(1)).await.unwrap();
        assert_eq!(next_day.notifications_sent, 0);

        let sent = f.dispatcher.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Frozen);
        assert_eq!(ledger.inner.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn freeze_notice_lost_before_a_rerun_goes_out_next_day() {
        let ledger = Arc::new(FlakyLedger {
            inner: InMemoryNotificationLedger::new(),
            failures: AtomicUsize::new(1),
        });
        let f = fixture_with_ledger(
            vec![(
                "grace-over",
                SubscriptionState::GracePeriod { grace_end: now().minus_days(1) },
                now().minus_days(6),
            )],
            ledger,
        )
        .await;

        f.job.run(JobScope::All, now()).await.unwrap();
        let next_day = f.job.run(JobScope::All, now().add_days(1)).await.unwrap();
        let day_after = f.job.run(JobScope::All, now().add_days(2)).await.unwrap();

        assert_eq!(next_day.notifications_sent, 1);
        assert_eq!(day_after.notifications_sent, 0);
        assert_eq!(f.dispatcher.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_is_isolated_to_vendor() {
        let f = fixture(vec![
            ("broken", SubscriptionState::Active, now().minus_days(1)),
            ("fine", SubscriptionState::Active, now().minus_days(1)),
        ])
        .await;
        f.stores.fail_updates_for(VendorId::new("broken").unwrap()).await;

        let report = f.job.run(JobScope::All, now()).await.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].stage, "persist");
        assert_eq!(report.errors[0].vendor_id.as_str(), "broken");
    }

    #[tokio::test]
    async fn refuses_to_run_while_locked() {
        let f = fixture(vec![]).await;
        let _held = f
            .lock
            .try_acquire(SUBSCRIPTION_JOB_LOCK, Duration::from_secs(60))
            .await
            .unwrap();

        let err = f.job.run(JobScope::All, now()).await.unwrap_err();

        assert_eq!(err, BillingError::JobAlreadyRunning);
    }

    #[tokio::test]
    async fn releases_lock_after_run() {
        let f = fixture(vec![]).await;
        f.job.run(JobScope::All, now()).await.unwrap();
        assert!(!f.lock.is_held(SUBSCRIPTION_JOB_LOCK).await);
    }

    #[tokio::test]
    async fn expired_grace_scope_only_freezes() {
        let f = fixture(vec![
            ("expired", SubscriptionState::Active, now().minus_days(1)),
            (
                "grace-over",
                SubscriptionState::GracePeriod { grace_end: now().minus_days(1) },
                now().minus_days(6),
            ),
        ])
        .await;

        let report = f.job.run(JobScope::ExpiredGracePeriods, now()).await.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.frozen, 1);
        let untouched = f
            .stores
            .find_by_vendor(&VendorId::new("expired").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.status(), SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn scoped_rerun_does_not_resend() {
        let f = fixture(vec![("expiring", SubscriptionState::Active, now().add_days(2))]).await;

        let first = f.job.run(JobScope::ExpiryWarnings, now()).await.unwrap();
        let second = f.job.run(JobScope::ExpiryWarnings, now()).await.unwrap();

        assert_eq!(first.warned, 1);
        assert_eq!(second.processed, 1);
        assert_eq!(second.warned, 0);
        assert_eq!(second.notifications_sent, 0);
    }
}
