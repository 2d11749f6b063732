//! Redis-backed job lock for multi-replica deployments.
//!
//! Acquire is `SET key token NX PX ttl`. Release runs a compare-and-delete
//! script so a holder whose lease already expired cannot drop the lock of
//! whoever took over.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{JobLock, LockLease};

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisJobLock {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisJobLock {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: "vendor-billing:lock:".to_string(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }
}

fn cache_error(e: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::LockUnavailable, format!("Redis error: {}", e))
}

#[async_trait]
impl JobLock for RedisJobLock {
    async fn try_acquire(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<LockLease>, DomainError> {
        let token = Uuid::new_v4().to_string();
        let mut conn = self.conn.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key(name))
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(reply.map(|_| LockLease {
            name: name.to_string(),
            token,
        }))
    }

    async fn release(&self, lease: &LockLease) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        let _: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(self.key(&lease.name))
            .arg(&lease.token)
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisJobLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisJobLock")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}
