//! Billing configuration
//!
//! Lifecycle lengths, price, and the tunables of the daily job.

use serde::Deserialize;
use std::time::Duration;

use crate::application::handlers::billing::{EngineSettings, JobSettings};
use crate::domain::billing::BillingPolicy;

use super::error::ValidationError;

/// Billing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    #[serde(default = "default_cycle_days")]
    pub cycle_days: i64,

    #[serde(default = "default_grace_days")]
    pub grace_days: i64,

    #[serde(default = "default_warning_days")]
    pub warning_days: i64,

    /// Price of one cycle in minor units (kobo)
    #[serde(default = "default_subscription_amount")]
    pub subscription_amount: i64,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Records evaluated concurrently by the daily job
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    /// Lease on the job lock; bounds how long a crashed run blocks the next one
    #[serde(default = "default_job_lock_ttl")]
    pub job_lock_ttl_secs: u64,

    #[serde(default = "default_max_notification_attempts")]
    pub max_notification_attempts: u32,

    /// Six-field cron expression for the in-process daily run; unset leaves
    /// triggering to an external scheduler
    pub schedule: Option<String>,
}

impl BillingConfig {
    pub fn policy(&self) -> Result<BillingPolicy, ValidationError> {
        BillingPolicy::new(self.cycle_days, self.grace_days, self.warning_days)
            .map_err(|e| ValidationError::InvalidBillingPolicy(e.to_string()))
    }

    /// Engine settings for the use cases.
    pub fn engine_settings(
        &self,
        callback_url: Option<String>,
    ) -> Result<EngineSettings, ValidationError> {
        Ok(EngineSettings {
            policy: self.policy()?,
            job: JobSettings {
                worker_concurrency: self.worker_concurrency,
                lock_ttl: Duration::from_secs(self.job_lock_ttl_secs),
                ..JobSettings::default()
            },
            max_conflict_retries: self.max_conflict_retries,
            max_notification_attempts: self.max_notification_attempts,
            subscription_amount: self.subscription_amount,
            currency: self.currency.clone(),
            callback_url,
        })
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.policy()?;
        if self.subscription_amount <= 0 {
            return Err(ValidationError::MustBePositive("billing.subscription_amount"));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        if self.worker_concurrency == 0 {
            return Err(ValidationError::MustBePositive("billing.worker_concurrency"));
        }
        if self.job_lock_ttl_secs == 0 {
            return Err(ValidationError::MustBePositive("billing.job_lock_ttl_secs"));
        }
        if self.max_notification_attempts == 0 {
            return Err(ValidationError::MustBePositive("billing.max_notification_attempts"));
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            cycle_days: default_cycle_days(),
            grace_days: default_grace_days(),
            warning_days: default_warning_days(),
            subscription_amount: default_subscription_amount(),
            currency: default_currency(),
            worker_concurrency: default_worker_concurrency(),
            max_conflict_retries: default_max_conflict_retries(),
            job_lock_ttl_secs: default_job_lock_ttl(),
            max_notification_attempts: default_max_notification_attempts(),
            schedule: None,
        }
    }
}

fn default_cycle_days() -> i64 {
    30
}

fn default_grace_days() -> i64 {
    5
}

fn default_warning_days() -> i64 {
    3
}

fn default_subscription_amount() -> i64 {
    500_000
}

fn default_currency() -> String {
    "NGN".to_string()
}

fn default_worker_concurrency() -> usize {
    8
}

fn default_max_conflict_retries() -> u32 {
    5
}

fn default_job_lock_ttl() -> u64 {
    900
}

fn default_max_notification_attempts() -> u32 {
    5
}
