//! Errors raised while loading or checking `AppConfig`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A loaded value that the service cannot run with.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("HTTP timeouts must be 1-300s, with the job timeout no shorter")]
    InvalidTimeout,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool needs max_connections > 0 and min_connections <= max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid Paystack secret key format")]
    InvalidPaystackKey,

    #[error("Invalid URL for {0}")]
    InvalidUrl(&'static str),

    #[error("Invalid Resend API key format")]
    InvalidResendKey,

    #[error("Invalid from email address")]
    InvalidFromEmail,

    #[error("Invalid billing policy: {0}")]
    InvalidBillingPolicy(String),

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Shared secret {0} must be at least 16 characters")]
    WeakSecret(&'static str),

    #[error("billing.job_lock_ttl_secs ({lock_ttl_secs}) is shorter than server.job_timeout_secs ({job_timeout_secs})")]
    LockShorterThanJob {
        lock_ttl_secs: u64,
        job_timeout_secs: u64,
    },
}
