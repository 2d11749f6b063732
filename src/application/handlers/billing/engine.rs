//! BillingEngine - wires every billing use case from a set of ports.

use std::sync::Arc;

use crate::domain::billing::{BillingPolicy, BillingStateMachine};
use crate::ports::{
    JobLock, NotificationDispatcher, NotificationLedger, PaymentGateway, StoreRepository,
    UserRepository,
};

use super::{
    AdminActionHandler, BankDirectoryHandler, HandlePaymentWebhookHandler,
    InitializeSubscriptionPaymentHandler, JobSettings, NotificationService,
    RunDailySubscriptionJobHandler, SubscriptionUpdater,
};

/// Port implementations the engine runs on.
#[derive(Clone)]
pub struct BillingDependencies {
    pub stores: Arc<dyn StoreRepository>,
    pub users: Arc<dyn UserRepository>,
    pub ledger: Arc<dyn NotificationLedger>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub lock: Arc<dyn JobLock>,
}

/// Tunables shared by the use cases.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub policy: BillingPolicy,
    pub job: JobSettings,
    pub max_conflict_retries: u32,
    pub max_notification_attempts: u32,
    /// Subscription price in minor units.
    pub subscription_amount: i64,
    pub currency: String,
    pub callback_url: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            policy: BillingPolicy::default(),
            job: JobSettings::default(),
            max_conflict_retries: 5,
            max_notification_attempts: 5,
            subscription_amount: 500_000,
            currency: "NGN".to_string(),
            callback_url: None,
        }
    }
}

pub struct BillingEngine {
    pub updater: Arc<SubscriptionUpdater>,
    pub notifications: Arc<NotificationService>,
    pub webhook: HandlePaymentWebhookHandler,
    pub daily_job: Arc<RunDailySubscriptionJobHandler>,
    pub admin: AdminActionHandler,
    pub initialize_payment: InitializeSubscriptionPaymentHandler,
    pub banks: BankDirectoryHandler,
}

impl BillingEngine {
    pub fn new(deps: BillingDependencies, settings: EngineSettings) -> Self {
        let updater = Arc::new(SubscriptionUpdater::new(
            deps.stores.clone(),
            BillingStateMachine::new(settings.policy),
            settings.max_conflict_retries,
        ));
        let notifications = Arc::new(NotificationService::new(
            deps.ledger.clone(),
            deps.dispatcher.clone(),
            deps.users.clone(),
            settings.max_notification_attempts,
        ));
        let daily_job = Arc::new(RunDailySubscriptionJobHandler::new(
            deps.stores.clone(),
            updater.clone(),
            notifications.clone(),
            deps.lock.clone(),
            settings.job,
        ));

        Self {
            webhook: HandlePaymentWebhookHandler::new(
                deps.gateway.clone(),
                updater.clone(),
                notifications.clone(),
            ),
            admin: AdminActionHandler::new(
                daily_job.clone(),
                updater.clone(),
                notifications.clone(),
                deps.stores.clone(),
                settings.subscription_amount,
            ),
            initialize_payment: InitializeSubscriptionPaymentHandler::new(
                deps.gateway.clone(),
                deps.users.clone(),
                deps.stores.clone(),
                settings.subscription_amount,
                settings.currency,
                settings.callback_url,
            ),
            banks: BankDirectoryHandler::new(deps.gateway),
            updater,
            notifications,
            daily_job,
        }
    }
}
