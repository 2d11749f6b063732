//! In-memory port implementations for tests and single-process runs.

mod notification_ledger;
mod store_repository;
mod user_repository;

pub use notification_ledger::InMemoryNotificationLedger;
pub use store_repository::InMemoryStoreRepository;
pub use user_repository::InMemoryUserRepository;
