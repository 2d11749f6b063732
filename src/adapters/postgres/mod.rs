//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresStoreRepository` - Subscription fields on the `stores` table
//! - `PostgresUserRepository` - Vendor contact details
//! - `PostgresNotificationLedger` - At-most-once notification ledger
//!
//! Schema lives in `migrations/` and is applied at startup.

mod notification_ledger;
mod store_repository;
mod user_repository;

pub use notification_ledger::PostgresNotificationLedger;
pub use store_repository::PostgresStoreRepository;
pub use user_repository::PostgresUserRepository;
