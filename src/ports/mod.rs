//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `StoreRepository` - Subscription records with conditional writes
//! - `UserRepository` - Vendor contact details
//! - `NotificationLedger` - At-most-once notification bookkeeping
//!
//! ## Integration Ports
//!
//! - `NotificationDispatcher` - Vendor-facing emails
//! - `PaymentGateway` - Charges, webhook signatures, bank lookups
//! - `JobLock` - Single-flight guard for the daily job

mod job_lock;
mod notification_dispatcher;
mod notification_ledger;
mod payment_gateway;
mod store_repository;
mod user_repository;

pub use job_lock::{JobLock, LockLease};
pub use notification_dispatcher::{DispatchError, NotificationDispatcher};
pub use notification_ledger::{NotificationLedger, ReserveOutcome};
pub use payment_gateway::{
    AccountInfo, Bank, ChargeHandle, GatewayError, GatewayErrorCode, InitializePaymentRequest,
    PaymentGateway, WebhookNotice,
};
pub use store_repository::{StoreRepository, SubscriptionFilter, UpdateOutcome};
pub use user_repository::{UserRepository, VendorInfo};
