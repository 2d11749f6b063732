//! Typed configuration for the billing service.
//!
//! Values come from the process environment (and a `.env` file in
//! development) under the `VENDOR_BILLING` prefix, with `__` between
//! nesting levels:
//!
//! ```text
//! VENDOR_BILLING__DATABASE__URL=postgres://localhost/vendor_billing
//! VENDOR_BILLING__PAYMENT__SECRET_KEY=sk_test_...
//! VENDOR_BILLING__BILLING__GRACE_DAYS=7
//! VENDOR_BILLING__BILLING__SCHEDULE="0 0 2 * * *"
//! ```
//!
//! `database`, `payment`, `email` and `security` have required fields; the
//! other sections fall back to defaults.

mod billing;
mod database;
mod email;
mod error;
mod payment;
mod redis;
mod security;
mod server;

pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use redis::RedisConfig;
pub use security::SecurityConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

const ENV_PREFIX: &str = "VENDOR_BILLING";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Unset means the job lock is process-local.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Paystack credentials and client tunables.
    pub payment: PaymentConfig,

    /// Resend credentials and sender identity.
    pub email: EmailConfig,

    /// Lifecycle lengths, price and job tunables.
    #[serde(default)]
    pub billing: BillingConfig,

    /// Cron and admin shared secrets.
    pub security: SecurityConfig,
}

impl AppConfig {
    /// Reads `.env` if present, then the `VENDOR_BILLING__*` environment.
    ///
    /// Only shape is checked here; call [`AppConfig::validate`] before use.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Checks every section, then the settings that span sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.payment.validate()?;
        self.email.validate()?;
        self.billing.validate()?;
        self.security.validate()?;

        // The lease must outlive an HTTP-triggered run or a second
        // trigger could start while the first is still walking records.
        if self.billing.job_lock_ttl_secs < self.server.job_timeout_secs {
            return Err(ValidationError::LockShorterThanJob {
                lock_ttl_secs: self.billing.job_lock_ttl_secs,
                job_timeout_secs: self.server.job_timeout_secs,
            });
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
