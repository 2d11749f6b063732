//! PostgreSQL notification ledger.
//!
//! The primary key `(vendor_id, kind, period_key)` plus
//! `ON CONFLICT DO NOTHING` gives exactly one `Reserved` per key across
//! every process sharing the database. Retry claims lock their rows with
//! `FOR UPDATE SKIP LOCKED` and flip them to `sending` in one statement.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::domain::billing::{
    DeliveryStatus, Notification, NotificationKey, NotificationKind, NotificationRecord, PeriodKey,
};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, ValidationError, VendorId};
use crate::ports::{NotificationLedger, ReserveOutcome};

pub struct PostgresNotificationLedger {
    pool: PgPool,
}

impl PostgresNotificationLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    vendor_id: String,
    kind: String,
    period_key: NaiveDate,
    current_period_end: DateTime<Utc>,
    grace_end: Option<DateTime<Utc>>,
    frozen_at: Option<DateTime<Utc>>,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<LedgerRow> for NotificationRecord {
    type Error = DomainError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let invalid = |what: &str, e: String| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid ledger {}: {}", what, e))
        };
        let kind: NotificationKind = row
            .kind
            .parse()
            .map_err(|e: ValidationError| invalid("kind", e.to_string()))?;
        let status: DeliveryStatus = row
            .status
            .parse()
            .map_err(|e: ValidationError| invalid("status", e.to_string()))?;

        Ok(NotificationRecord {
            notification: Notification {
                key: NotificationKey {
                    vendor_id: VendorId::new(row.vendor_id)
                        .map_err(|e| invalid("vendor_id", e.to_string()))?,
                    kind,
                    period_key: PeriodKey::from_date(row.period_key),
                },
                current_period_end: Timestamp::from_datetime(row.current_period_end),
                grace_end: row.grace_end.map(Timestamp::from_datetime),
                frozen_at: row.frozen_at.map(Timestamp::from_datetime),
            },
            status,
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            last_error: row.last_error,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            sent_at: row.sent_at.map(Timestamp::from_datetime),
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT vendor_id, kind, period_key, current_period_end, grace_end, frozen_at,
           status, attempts, last_error, created_at, updated_at, sent_at
    FROM notification_ledger
"#;

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

fn not_reserved(key: &NotificationKey) -> DomainError {
    DomainError::new(ErrorCode::InternalError, "Notification not reserved")
        .with_detail("vendor_id", key.vendor_id.as_str())
        .with_detail("kind", key.kind.as_str())
}

#[async_trait]
impl NotificationLedger for PostgresNotificationLedger {
    async fn reserve(
        &self,
        notification: &Notification,
        now: Timestamp,
    ) -> Result<ReserveOutcome, DomainError> {
        let key = &notification.key;
        let result = sqlx::query(
            r#"
            INSERT INTO notification_ledger (
                vendor_id, kind, period_key, current_period_end, grace_end, frozen_at,
                status, attempts, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 'sending', 0, $7, $7)
            ON CONFLICT (vendor_id, kind, period_key) DO NOTHING
            "#,
        )
        .bind(key.vendor_id.as_str())
        .bind(key.kind.as_str())
        .bind(key.period_key.date())
        .bind(notification.current_period_end.as_datetime())
        .bind(notification.grace_end.map(|t| *t.as_datetime()))
        .bind(notification.frozen_at.map(|t| *t.as_datetime()))
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to reserve notification", e))?;

        Ok(if result.rows_affected() == 1 {
            ReserveOutcome::Reserved
        } else {
            ReserveOutcome::AlreadyRecorded
        })
    }

    async fn mark_sent(&self, key: &NotificationKey, now: Timestamp) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE notification_ledger SET
                status = 'sent',
                attempts = attempts + 1,
                last_error = NULL,
                updated_at = $4,
                sent_at = $4
            WHERE vendor_id = $1 AND kind = $2 AND period_key = $3
            "#,
        )
        .bind(key.vendor_id.as_str())
        .bind(key.kind.as_str())
        .bind(key.period_key.date())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark notification sent", e))?;

        if result.rows_affected() == 0 {
            return Err(not_reserved(key));
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        key: &NotificationKey,
        error: &str,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE notification_ledger SET
                status = 'pending',
                attempts = attempts + 1,
                last_error = $4,
                updated_at = $5
            WHERE vendor_id = $1 AND kind = $2 AND period_key = $3 AND status = 'sending'
            "#,
        )
        .bind(key.vendor_id.as_str())
        .bind(key.kind.as_str())
        .bind(key.period_key.date())
        .bind(error)
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record notification failure", e))?;

        if result.rows_affected() == 0 {
            return Err(not_reserved(key));
        }
        Ok(())
    }

    async fn claim_retries(
        &self,
        max_attempts: u32,
        limit: usize,
        stale_before: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<NotificationRecord>, DomainError> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            UPDATE notification_ledger AS l SET
                status = 'sending',
                updated_at = $4
            FROM (
                SELECT vendor_id, kind, period_key
                FROM notification_ledger
                WHERE attempts < $1
                  AND (status = 'pending' OR (status = 'sending' AND updated_at < $3))
                ORDER BY created_at
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            ) AS due
            WHERE l.vendor_id = due.vendor_id
              AND l.kind = due.kind
              AND l.period_key = due.period_key
            RETURNING l.vendor_id, l.kind, l.period_key, l.current_period_end, l.grace_end,
                      l.frozen_at, l.status, l.attempts, l.last_error, l.created_at,
                      l.updated_at, l.sent_at
            "#,
        )
        .bind(i32::try_from(max_attempts).unwrap_or(i32::MAX))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(stale_before.as_datetime())
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to claim notifications for retry", e))?;

        let mut claimed = rows
            .into_iter()
            .map(NotificationRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        // RETURNING does not keep the subquery order.
        claimed.sort_by_key(|r| r.created_at);
        Ok(claimed)
    }

    async fn find(&self, key: &NotificationKey) -> Result<Option<NotificationRecord>, DomainError> {
        let row: Option<LedgerRow> = sqlx::query_as(&format!(
            "{} WHERE vendor_id = $1 AND kind = $2 AND period_key = $3",
            SELECT_COLUMNS
        ))
        .bind(key.vendor_id.as_str())
        .bind(key.kind.as_str())
        .bind(key.period_key.date())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch notification", e))?;

        row.map(NotificationRecord::try_from).transpose()
    }
}
