//! In-memory job lock for tests and single-server deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::foundation::DomainError;
use crate::ports::{JobLock, LockLease};

#[derive(Debug, Clone)]
struct Held {
    token: String,
    expires_at: Instant,
}

/// Lease table guarded by a mutex. Expired leases are taken over.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobLock {
    held: Arc<Mutex<HashMap<String, Held>>>,
}

impl InMemoryJobLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while an unexpired lease exists for `name`.
    pub async fn is_held(&self, name: &str) -> bool {
        self.held
            .lock()
            .await
            .get(name)
            .map(|h| h.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

#[async_trait]
impl JobLock for InMemoryJobLock {
    async fn try_acquire(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<LockLease>, DomainError> {
        let now = Instant::now();
        let mut held = self.held.lock().await;

        if let Some(current) = held.get(name) {
            if current.expires_at > now {
                return Ok(None);
            }
        }

        let token = Uuid::new_v4().to_string();
        held.insert(
            name.to_string(),
            Held {
                token: token.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(Some(LockLease {
            name: name.to_string(),
            token,
        }))
    }

    async fn release(&self, lease: &LockLease) -> Result<(), DomainError> {
        let mut held = self.held.lock().await;
        if held.get(&lease.name).map(|h| h.token == lease.token).unwrap_or(false) {
            held.remove(&lease.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_fails_while_held() {
        let lock = InMemoryJobLock::new();
        let first = lock.try_acquire("job", Duration::from_secs(60)).await.unwrap();
        let second = lock.try_acquire("job", Duration::from_secs(60)).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn release_frees_the_lock() {
        let lock = InMemoryJobLock::new();
        let lease = lock
            .try_acquire("job", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();
        lock.release(&lease).await.unwrap();

        assert!(!lock.is_held("job").await);
        assert!(lock.try_acquire("job", Duration::from_secs(60)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_lease_can_be_taken_over() {
        let lock = InMemoryJobLock::new();
        lock.try_acquire("job", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(lock.try_acquire("job", Duration::from_secs(60)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stale_lease_cannot_release_new_holder() {
        let lock = InMemoryJobLock::new();
        let stale = lock
            .try_acquire("job", Duration::from_millis(1))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _current = lock.try_acquire("job", Duration::from_secs(60)).await.unwrap();

        lock.release(&stale).await.unwrap();
        assert!(lock.is_held("job").await);
    }
}
