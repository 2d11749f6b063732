//! Redis connection for the shared job lock.
//!
//! Optional. Without a URL the lock is process-local, which is only safe
//! with a single replica.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// `redis://` or `rediss://`; unset or blank disables the shared lock.
    pub url: Option<String>,

    /// Connect timeout at startup.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured URL, if any.
    pub fn lock_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.lock_url().is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let Some(url) = self.lock_url() else {
            return Ok(());
        };
        if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("redis.timeout_secs"));
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    5
}
