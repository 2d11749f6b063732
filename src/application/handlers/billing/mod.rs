//! Billing handlers.
//!
//! Use cases over the subscription lifecycle:
//!
//! ## Commands
//! - Applying gateway webhooks to subscriptions
//! - Running the daily reconciliation job (and its scoped admin variants)
//! - Admin overrides: freeze, reactivate, cancel
//! - Starting a subscription charge
//!
//! ## Queries
//! - Vendor and fleet subscription status (admin)
//! - Bank directory lookups
//!
//! Every record change goes through `SubscriptionUpdater`; every outbound
//! notification goes through `NotificationService`.

mod admin_actions;
mod bank_directory;
mod engine;
mod handle_payment_webhook;
mod initialize_payment;
mod notification_service;
mod run_daily_job;
mod subscription_updater;

// Shared services
pub use engine::{BillingDependencies, BillingEngine, EngineSettings};
pub use notification_service::{DeliveryFailure, DeliveryReport, NotificationService};
pub use subscription_updater::{AppliedTransition, SubscriptionUpdater};

// Commands
pub use admin_actions::{
    AdminAction, AdminActionHandler, AdminActionResult, SubscriptionOverview, SubscriptionSnapshot,
};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
};
pub use initialize_payment::{
    InitializeSubscriptionPaymentCommand, InitializeSubscriptionPaymentHandler,
    InitializeSubscriptionPaymentResult,
};
pub use run_daily_job::{
    JobError, JobReport, JobScope, JobSettings, RunDailySubscriptionJobHandler,
    SUBSCRIPTION_JOB_LOCK,
};

// Queries
pub use bank_directory::{BankDirectoryHandler, ResolveAccountQuery};
