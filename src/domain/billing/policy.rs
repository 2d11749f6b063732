//! Billing timing policy.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Day counts that drive the subscription lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPolicy {
    /// Length of one paid billing cycle.
    pub cycle_days: i64,
    /// Days a vendor keeps access after the period ends.
    pub grace_days: i64,
    /// Days before period end when the expiry warning starts.
    pub warning_days: i64,
}

impl BillingPolicy {
    pub fn new(cycle_days: i64, grace_days: i64, warning_days: i64) -> Result<Self, ValidationError> {
        if !(1..=366).contains(&cycle_days) {
            return Err(ValidationError::out_of_range("cycle_days", 1, 366, cycle_days));
        }
        if !(0..=cycle_days).contains(&grace_days) {
            return Err(ValidationError::out_of_range("grace_days", 0, cycle_days, grace_days));
        }
        if !(0..cycle_days).contains(&warning_days) {
            return Err(ValidationError::out_of_range(
                "warning_days",
                0,
                cycle_days - 1,
                warning_days,
            ));
        }
        Ok(Self {
            cycle_days,
            grace_days,
            warning_days,
        })
    }
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            cycle_days: 30,
            grace_days: 5,
            warning_days: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_thirty_day_cycle_with_five_day_grace() {
        let policy = BillingPolicy::default();
        assert_eq!(policy.cycle_days, 30);
        assert_eq!(policy.grace_days, 5);
        assert_eq!(policy.warning_days, 3);
    }

    #[test]
    fn rejects_zero_cycle() {
        assert!(BillingPolicy::new(0, 0, 0).is_err());
    }

    #[test]
    fn rejects_warning_window_as_long_as_cycle() {
        assert!(BillingPolicy::new(30, 5, 30).is_err());
        assert!(BillingPolicy::new(30, 5, 29).is_ok());
    }

    #[test]
    fn rejects_negative_grace() {
        assert!(BillingPolicy::new(30, -1, 3).is_err());
    }
}
