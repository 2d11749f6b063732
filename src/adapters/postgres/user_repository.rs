//! PostgreSQL implementation of UserRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, StoreId, VendorId};
use crate::ports::{UserRepository, VendorInfo};

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VendorRow {
    id: String,
    email: String,
    display_name: String,
    store_id: String,
    store_name: String,
}

impl TryFrom<VendorRow> for VendorInfo {
    type Error = DomainError;

    fn try_from(row: VendorRow) -> Result<Self, Self::Error> {
        let invalid = |what: &str, e: String| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", what, e))
        };
        Ok(VendorInfo {
            vendor_id: VendorId::new(row.id).map_err(|e| invalid("vendor id", e.to_string()))?,
            store_id: StoreId::new(row.store_id).map_err(|e| invalid("store id", e.to_string()))?,
            email: row.email,
            display_name: row.display_name,
            store_name: row.store_name,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_vendor(&self, vendor_id: &VendorId) -> Result<Option<VendorInfo>, DomainError> {
        let row: Option<VendorRow> = sqlx::query_as(
            r#"
            SELECT v.id, v.email, v.display_name, s.id AS store_id, s.name AS store_name
            FROM vendors v
            JOIN stores s ON s.vendor_id = v.id
            WHERE v.id = $1
            "#,
        )
        .bind(vendor_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch vendor: {}", e)))?;

        row.map(VendorInfo::try_from).transpose()
    }
}
