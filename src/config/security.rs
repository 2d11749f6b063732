//! Shared secrets for operator endpoints

use serde::Deserialize;

use super::error::ValidationError;

const MIN_SECRET_LEN: usize = 16;

/// Secrets for the job trigger and admin endpoints.
#[derive(Clone, Default, Deserialize)]
pub struct SecurityConfig {
    pub cron_secret: String,
    pub admin_secret: String,
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cron_secret.is_empty() {
            return Err(ValidationError::MissingRequired("SECURITY__CRON_SECRET"));
        }
        if self.admin_secret.is_empty() {
            return Err(ValidationError::MissingRequired("SECURITY__ADMIN_SECRET"));
        }
        if self.cron_secret.len() < MIN_SECRET_LEN {
            return Err(ValidationError::WeakSecret("cron_secret"));
        }
        if self.admin_secret.len() < MIN_SECRET_LEN {
            return Err(ValidationError::WeakSecret("admin_secret"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("cron_secret", &"[REDACTED]")
            .field("admin_secret", &"[REDACTED]")
            .finish()
    }
}
