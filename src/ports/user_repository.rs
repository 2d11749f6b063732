//! User repository port (read side).
//!
//! Vendor contact details live with the marketplace's user accounts; billing
//! only reads them to address notifications and charges.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, StoreId, VendorId};

/// Contact details of a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorInfo {
    pub vendor_id: VendorId,
    pub store_id: StoreId,
    pub email: String,
    pub display_name: String,
    pub store_name: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a vendor's contact details.
    ///
    /// Returns `None` for unknown vendors.
    async fn find_vendor(&self, vendor_id: &VendorId) -> Result<Option<VendorInfo>, DomainError>;
}
