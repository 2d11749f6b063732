//! BankDirectoryHandler - bank list and account-name lookups for payouts.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::ports::{AccountInfo, Bank, PaymentGateway};

/// Query to resolve an account number to its holder's name.
#[derive(Debug, Clone)]
pub struct ResolveAccountQuery {
    pub bank_code: String,
    pub account_number: String,
}

impl ResolveAccountQuery {
    fn validate(&self) -> Result<(), BillingError> {
        if self.bank_code.trim().is_empty() {
            return Err(BillingError::validation("bank_code", "bank code is required"));
        }
        let digits = self.account_number.trim();
        if digits.len() != 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(BillingError::validation(
                "account_number",
                "account number must be exactly 10 digits",
            ));
        }
        Ok(())
    }
}

pub struct BankDirectoryHandler {
    gateway: Arc<dyn PaymentGateway>,
}

impl BankDirectoryHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    pub async fn list_banks(&self) -> Result<Vec<Bank>, BillingError> {
        Ok(self.gateway.list_banks().await?)
    }

    pub async fn resolve_account(&self, query: ResolveAccountQuery) -> Result<AccountInfo, BillingError> {
        query.validate()?;
        let info = self
            .gateway
            .resolve_bank_account(query.bank_code.trim(), query.account_number.trim())
            .await?;
        tracing::debug!(bank_code = %info.bank_code, "Resolved bank account");
        Ok(info)
    }
}
