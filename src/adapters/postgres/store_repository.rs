//! PostgreSQL implementation of StoreRepository.
//!
//! Subscription fields live on the `stores` row. Every write is a single
//! `UPDATE ... WHERE vendor_id = $1 AND subscription_version = $2`, so the
//! row lock Postgres takes for the update is the only synchronization.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::domain::billing::{
    StoreVisibility, SubscriptionFields, SubscriptionRecord, SubscriptionState, SubscriptionStatus,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentReference, StoreId, Timestamp, VendorId,
};
use crate::ports::{StoreRepository, SubscriptionFilter, UpdateOutcome};

/// PostgreSQL implementation of the StoreRepository port.
pub struct PostgresStoreRepository {
    pool: PgPool,
}

impl PostgresStoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Subscription columns of a `stores` row.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: String,
    vendor_id: String,
    subscription_status: String,
    current_period_end: DateTime<Utc>,
    grace_end: Option<DateTime<Utc>>,
    frozen_at: Option<DateTime<Utc>>,
    processed_payment_refs: Vec<String>,
    last_processed_payment_ref: Option<String>,
    last_tick_date: Option<NaiveDate>,
    subscription_version: i64,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, vendor_id, subscription_status, current_period_end, grace_end, frozen_at,
           processed_payment_refs, last_processed_payment_ref, last_tick_date,
           subscription_version
    FROM stores
"#;

fn corrupt(what: &str, detail: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", what, detail))
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status: SubscriptionStatus = row
            .subscription_status
            .parse()
            .map_err(|e| corrupt("subscription_status", e))?;
        let state = SubscriptionState::from_parts(
            status,
            row.grace_end.map(Timestamp::from_datetime),
            row.frozen_at.map(Timestamp::from_datetime),
        )
        .map_err(|e| corrupt("subscription state", e))?;

        let processed_payment_refs = row
            .processed_payment_refs
            .into_iter()
            .map(PaymentReference::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt("processed_payment_refs", e))?;

        Ok(SubscriptionRecord {
            vendor_id: VendorId::new(row.vendor_id).map_err(|e| corrupt("vendor_id", e))?,
            store_id: StoreId::new(row.id).map_err(|e| corrupt("store id", e))?,
            state,
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            processed_payment_refs,
            last_processed_payment_ref: row
                .last_processed_payment_ref
                .map(PaymentReference::new)
                .transpose()
                .map_err(|e| corrupt("last_processed_payment_ref", e))?,
            last_tick_date: row.last_tick_date,
            version: u64::try_from(row.subscription_version)
                .map_err(|e| corrupt("subscription_version", e))?,
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

fn version_param(version: u64) -> Result<i64, DomainError> {
    i64::try_from(version).map_err(|_| {
        DomainError::validation("expected_version", "version exceeds storage range")
    })
}

#[async_trait]
impl StoreRepository for PostgresStoreRepository {
    async fn find_by_vendor(
        &self,
        vendor_id: &VendorId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE vendor_id = $1", SELECT_COLUMNS))
                .bind(vendor_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to fetch subscription", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn list_subscriptions(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let statuses: Option<Vec<String>> = if filter.statuses.is_empty() {
            None
        } else {
            Some(filter.statuses.iter().map(|s| s.as_str().to_string()).collect())
        };

        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE ($1::text[] IS NULL OR subscription_status = ANY($1))
              AND ($2::timestamptz IS NULL OR current_period_end <= $2)
              AND ($3::timestamptz IS NULL OR current_period_end > $3)
              AND ($4::timestamptz IS NULL OR (grace_end IS NOT NULL AND grace_end < $4))
            ORDER BY vendor_id
            "#,
            SELECT_COLUMNS
        ))
        .bind(statuses)
        .bind(filter.period_end_before.map(|t| *t.as_datetime()))
        .bind(filter.period_end_after.map(|t| *t.as_datetime()))
        .bind(filter.grace_end_before.map(|t| *t.as_datetime()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list subscriptions", e))?;

        rows.into_iter().map(SubscriptionRecord::try_from).collect()
    }

    async fn update_subscription_fields(
        &self,
        vendor_id: &VendorId,
        expected_version: u64,
        fields: &SubscriptionFields,
    ) -> Result<UpdateOutcome, DomainError> {
        let refs: Vec<String> = fields
            .processed_payment_refs
            .iter()
            .map(|r| r.as_str().to_string())
            .collect();

        let new_version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE stores SET
                subscription_status = $3,
                current_period_end = $4,
                grace_end = $5,
                frozen_at = $6,
                processed_payment_refs = $7,
                last_processed_payment_ref = $8,
                last_tick_date = $9,
                is_visible = COALESCE($10, is_visible),
                subscription_version = subscription_version + 1,
                updated_at = now()
            WHERE vendor_id = $1 AND subscription_version = $2
            RETURNING subscription_version
            "#,
        )
        .bind(vendor_id.as_str())
        .bind(version_param(expected_version)?)
        .bind(fields.state.status().as_str())
        .bind(fields.current_period_end.as_datetime())
        .bind(fields.state.grace_end().map(|t| *t.as_datetime()))
        .bind(fields.state.frozen_at().map(|t| *t.as_datetime()))
        .bind(&refs)
        .bind(fields.last_processed_payment_ref.as_ref().map(|r| r.as_str()))
        .bind(fields.last_tick_date)
        .bind(fields.visibility.map(|v| v.is_visible()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update subscription", e))?;

        if let Some(version) = new_version {
            if fields.visibility == Some(StoreVisibility::Hidden) {
                tracing::info!(vendor_id = %vendor_id, "Store hidden");
            }
            return Ok(UpdateOutcome::Applied {
                version: u64::try_from(version).map_err(|e| corrupt("subscription_version", e))?,
            });
        }

        // Nothing matched: either the version moved or the vendor is unknown.
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM stores WHERE vendor_id = $1)")
            .bind(vendor_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to check store", e))?;

        if exists {
            Ok(UpdateOutcome::Conflict)
        } else {
            Err(DomainError::new(
                ErrorCode::StoreNotFound,
                format!("No store for vendor {}", vendor_id),
            )
            .with_detail("vendor_id", vendor_id.as_str()))
        }
    }

    async fn insert_subscription(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        let refs: Vec<String> = record
            .processed_payment_refs
            .iter()
            .map(|r| r.as_str().to_string())
            .collect();

        sqlx::query(
            r#"
            INSERT INTO stores (
                id, vendor_id, subscription_status, current_period_end, grace_end, frozen_at,
                processed_payment_refs, last_processed_payment_ref, last_tick_date,
                subscription_version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (vendor_id) DO NOTHING
            "#,
        )
        .bind(record.store_id.as_str())
        .bind(record.vendor_id.as_str())
        .bind(record.status().as_str())
        .bind(record.current_period_end.as_datetime())
        .bind(record.grace_end().map(|t| *t.as_datetime()))
        .bind(record.frozen_at().map(|t| *t.as_datetime()))
        .bind(&refs)
        .bind(record.last_processed_payment_ref.as_ref().map(|r| r.as_str()))
        .bind(record.last_tick_date)
        .bind(version_param(record.version)?)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert subscription", e))?;

        Ok(())
    }
}
