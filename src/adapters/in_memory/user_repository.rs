//! In-memory vendor directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, VendorId};
use crate::ports::{UserRepository, VendorInfo};

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    vendors: Arc<RwLock<HashMap<VendorId, VendorInfo>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, vendor: VendorInfo) {
        self.vendors
            .write()
            .await
            .insert(vendor.vendor_id.clone(), vendor);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_vendor(&self, vendor_id: &VendorId) -> Result<Option<VendorInfo>, DomainError> {
        Ok(self.vendors.read().await.get(vendor_id).cloned())
    }
}
