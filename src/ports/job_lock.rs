//! Single-flight job lock port.
//!
//! Keeps two reconciliation runs (cron and a manual trigger, or two
//! replicas) from working the same records at once. Leases expire after
//! their TTL so a crashed holder cannot wedge the job.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::DomainError;

/// Proof of holding a lock. Pass it back to `release`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    pub name: String,
    pub token: String,
}

#[async_trait]
pub trait JobLock: Send + Sync {
    /// Try to take the lock. Returns `None` when someone else holds it.
    async fn try_acquire(&self, name: &str, ttl: Duration)
        -> Result<Option<LockLease>, DomainError>;

    /// Release a lease. Releasing an expired or foreign lease is a no-op.
    async fn release(&self, lease: &LockLease) -> Result<(), DomainError>;
}
