//! Vendor-facing notifications and their dedupe key.
//!
//! A notification is identified by `(vendor_id, kind, period_key)`. The
//! ledger stores at most one row per key, which is what keeps re-runs of
//! the daily job and webhook redeliveries from sending the same email twice.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, ValidationError, VendorId};

/// Kinds of billing notifications sent to vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ExpiryWarning,
    GraceWarning,
    Frozen,
    Reactivated,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ExpiryWarning => "expiry_warning",
            NotificationKind::GraceWarning => "grace_warning",
            NotificationKind::Frozen => "frozen",
            NotificationKind::Reactivated => "reactivated",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expiry_warning" => Ok(NotificationKind::ExpiryWarning),
            "grace_warning" => Ok(NotificationKind::GraceWarning),
            "frozen" => Ok(NotificationKind::Frozen),
            "reactivated" => Ok(NotificationKind::Reactivated),
            other => Err(ValidationError::invalid_format(
                "notification_kind",
                format!("unknown kind '{}'", other),
            )),
        }
    }
}

/// Calendar day of the billing-cycle end a notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(NaiveDate);

impl PeriodKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn of(timestamp: Timestamp) -> Self {
        Self(timestamp.date())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Self)
            .map_err(|e| ValidationError::invalid_format("period_key", e.to_string()))
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Dedupe key of the notification ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationKey {
    pub vendor_id: VendorId,
    pub kind: NotificationKind,
    pub period_key: PeriodKey,
}

/// A notification emitted by a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub key: NotificationKey,
    pub current_period_end: Timestamp,
    pub grace_end: Option<Timestamp>,
    pub frozen_at: Option<Timestamp>,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        self.key.kind
    }

    pub fn vendor_id(&self) -> &VendorId {
        &self.key.vendor_id
    }
}

/// Delivery state of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Claimed by a caller that is dispatching it right now.
    Sending,
    /// Last attempt failed; waiting to be claimed for a retry.
    Pending,
    Sent,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sending => "sending",
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sending" => Ok(DeliveryStatus::Sending),
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            other => Err(ValidationError::invalid_format(
                "delivery_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Row of the notification ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub notification: Notification,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub sent_at: Option<Timestamp>,
}

impl NotificationRecord {
    /// Fresh reservation, owned by the caller that made it.
    pub fn reserved(notification: Notification, now: Timestamp) -> Self {
        Self {
            notification,
            status: DeliveryStatus::Sending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }

    pub fn key(&self) -> &NotificationKey {
        &self.notification.key
    }

    /// True when a retry may claim this row at `stale_before`.
    ///
    /// Failed rows qualify until they run out of attempts. A row still
    /// marked sending qualifies only once its claim is older than
    /// `stale_before`, which means its holder died mid-send.
    pub fn is_claimable(&self, max_attempts: u32, stale_before: Timestamp) -> bool {
        if self.attempts >= max_attempts {
            return false;
        }
        match self.status {
            DeliveryStatus::Pending => true,
            DeliveryStatus::Sending => self.updated_at.is_before(&stale_before),
            DeliveryStatus::Sent => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_key_formats_as_iso_date() {
        let ts = Timestamp::parse_rfc3339("2026-04-09T17:45:00Z").unwrap();
        assert_eq!(PeriodKey::of(ts).to_string(), "2026-04-09");
    }

    #[test]
    fn period_key_parses_what_it_prints() {
        let key = PeriodKey::parse("2026-12-31").unwrap();
        assert_eq!(key.to_string(), "2026-12-31");
        assert!(PeriodKey::parse("31/12/2026").is_err());
    }

    #[test]
    fn kind_parses_snake_case_names() {
        assert_eq!(
            "grace_warning".parse::<NotificationKind>(),
            Ok(NotificationKind::GraceWarning)
        );
        assert!("welcome".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn reserved_record_starts_claimed_without_attempts() {
        let now = Timestamp::now();
        let notification = Notification {
            key: NotificationKey {
                vendor_id: VendorId::new("v1").unwrap(),
                kind: NotificationKind::Frozen,
                period_key: PeriodKey::of(now),
            },
            current_period_end: now,
            grace_end: None,
            frozen_at: Some(now),
        };
        let record = NotificationRecord::reserved(notification, now);
        assert_eq!(record.status, DeliveryStatus::Sending);
        assert_eq!(record.attempts, 0);
        assert!(record.sent_at.is_none());
    }

    #[test]
    fn in_flight_rows_are_claimable_only_once_stale() {
        let now = Timestamp::parse_rfc3339("2026-06-01T06:00:00Z").unwrap();
        let notification = Notification {
            key: NotificationKey {
                vendor_id: VendorId::new("v1").unwrap(),
                kind: NotificationKind::GraceWarning,
                period_key: PeriodKey::of(now),
            },
            current_period_end: now,
            grace_end: Some(now.add_days(5)),
            frozen_at: None,
        };
        let mut record = NotificationRecord::reserved(notification, now);

        assert!(!record.is_claimable(3, now));
        assert!(record.is_claimable(3, now.add_days(1)));

        record.status = DeliveryStatus::Pending;
        record.attempts = 1;
        assert!(record.is_claimable(3, now));
        record.attempts = 3;
        assert!(!record.is_claimable(3, now));

        record.attempts = 1;
        record.status = DeliveryStatus::Sent;
        assert!(!record.is_claimable(3, now.add_days(1)));
    }
}
