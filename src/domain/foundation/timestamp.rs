//! UTC instants and the day arithmetic billing periods are built from.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time, always UTC.
///
/// Billing periods are whole days: `add_days(30)` on a payment instant is the
/// new period end, and `date()` is the calendar day the daily job keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// `self - other`; negative when `other` is later.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    pub fn minus_days(&self, days: i64) -> Self {
        Self(self.0 - Duration::days(days))
    }

    /// UTC calendar day.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Parses RFC 3339 with any offset, normalized to UTC.
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn at(value: &str) -> Timestamp {
        Timestamp::parse_rfc3339(value).unwrap()
    }

    #[test]
    fn add_and_minus_days_are_symmetric() {
        let ts = at("2026-03-01T12:00:00Z");
        assert_eq!(ts.add_days(30).minus_days(30), ts);
        assert_eq!(ts.add_days(-1), ts.minus_days(1));
    }

    #[test]
    fn thirty_day_period_crosses_month_end() {
        let paid_at = at("2026-01-15T09:00:00Z");
        assert_eq!(paid_at.add_days(30), at("2026-02-14T09:00:00Z"));
    }

    #[test]
    fn date_is_the_utc_calendar_day() {
        let ts = at("2026-03-01T23:30:00-02:00");
        let date = ts.date();
        assert_eq!((date.year(), date.month(), date.day()), (2026, 3, 2));
    }

    #[test]
    fn duration_since_is_signed() {
        let start = at("2026-01-01T00:00:00Z");
        let end = at("2026-01-04T00:00:00Z");
        assert_eq!(end.duration_since(&start).num_days(), 3);
        assert_eq!(start.duration_since(&end).num_days(), -3);
        assert!(start.is_before(&end) && end.is_after(&start));
    }

    #[test]
    fn serializes_as_a_bare_rfc3339_string() {
        let json = serde_json::to_string(&at("2024-01-15T10:30:00Z")).unwrap();
        assert!(json.starts_with("\"2024-01-15T10:30:00"));
    }

    #[test]
    fn parse_rfc3339_rejects_garbage() {
        assert!(Timestamp::parse_rfc3339("yesterday").is_none());
    }
}
