//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::billing::{
    AdminAction, AdminActionHandler, AdminActionResult, BankDirectoryHandler, BillingDependencies,
    BillingEngine, EngineSettings,
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
    InitializeSubscriptionPaymentCommand, InitializeSubscriptionPaymentHandler, JobReport, JobScope,
    JobSettings, NotificationService, RunDailySubscriptionJobHandler, SubscriptionUpdater,
};
