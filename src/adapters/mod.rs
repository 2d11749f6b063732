//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing core to external systems:
//! - `postgres` - Store, vendor and notification ledger persistence
//! - `in_memory` - The same ports backed by process memory
//! - `job_lock` - In-process and Redis job leases
//! - `paystack` - Payment gateway client and webhook verification
//! - `email` - Notification delivery
//! - `http` - Axum routes

pub mod email;
pub mod http;
pub mod in_memory;
pub mod job_lock;
pub mod paystack;
pub mod postgres;

pub use email::{RecordingDispatcher, ResendConfig, ResendDispatcher};
pub use in_memory::{InMemoryNotificationLedger, InMemoryStoreRepository, InMemoryUserRepository};
pub use job_lock::{InMemoryJobLock, RedisJobLock};
pub use paystack::{MockGateway, PaystackConfig, PaystackGateway};
pub use postgres::{PostgresNotificationLedger, PostgresStoreRepository, PostgresUserRepository};
