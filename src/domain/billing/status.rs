//! Subscription status state machine.
//!
//! `SubscriptionStatus` is the plain tag used for filtering and persistence.
//! `SubscriptionState` pairs the tag with the timestamps only that tag may
//! carry, so a record can never hold a `grace_end` outside the grace period
//! or a `frozen_at` on a live store.

use crate::domain::foundation::{StateMachine, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Billing status of a vendor's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid through `current_period_end`.
    Active,

    /// Period ended without renewal. Store stays visible until grace ends.
    GracePeriod,

    /// Grace expired or an admin froze the store. Hidden from buyers.
    Frozen,

    /// Explicitly cancelled. Terminal.
    Cancelled,
}

impl SubscriptionStatus {
    /// Stable string form used in storage and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::GracePeriod => "grace_period",
            SubscriptionStatus::Frozen => "frozen",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses the daily job still has work to do for.
    pub fn non_terminal() -> [SubscriptionStatus; 3] {
        [
            SubscriptionStatus::Active,
            SubscriptionStatus::GracePeriod,
            SubscriptionStatus::Frozen,
        ]
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "grace_period" => Ok(SubscriptionStatus::GracePeriod),
            "frozen" => Ok(SubscriptionStatus::Frozen),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From ACTIVE
            (Active, Active) // Renewal
                | (Active, GracePeriod)
                | (Active, Frozen) // Admin freeze only
                | (Active, Cancelled)
            // From GRACE_PERIOD
                | (GracePeriod, Active)
                | (GracePeriod, Frozen)
                | (GracePeriod, Cancelled)
            // From FROZEN
                | (Frozen, Active)
                | (Frozen, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![Active, GracePeriod, Frozen, Cancelled],
            GracePeriod => vec![Active, Frozen, Cancelled],
            Frozen => vec![Active, Cancelled],
            Cancelled => vec![],
        }
    }
}

/// Status together with its status-specific data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    GracePeriod { grace_end: Timestamp },
    Frozen { frozen_at: Timestamp },
    Cancelled,
}

impl SubscriptionState {
    pub fn status(&self) -> SubscriptionStatus {
        match self {
            SubscriptionState::Active => SubscriptionStatus::Active,
            SubscriptionState::GracePeriod { .. } => SubscriptionStatus::GracePeriod,
            SubscriptionState::Frozen { .. } => SubscriptionStatus::Frozen,
            SubscriptionState::Cancelled => SubscriptionStatus::Cancelled,
        }
    }

    pub fn grace_end(&self) -> Option<Timestamp> {
        match self {
            SubscriptionState::GracePeriod { grace_end } => Some(*grace_end),
            _ => None,
        }
    }

    pub fn frozen_at(&self) -> Option<Timestamp> {
        match self {
            SubscriptionState::Frozen { frozen_at } => Some(*frozen_at),
            _ => None,
        }
    }

    /// Rebuilds a state from its flattened storage columns.
    ///
    /// Fails when the columns disagree with the tag (e.g. a grace period
    /// without a `grace_end`), which only a corrupted row can produce.
    pub fn from_parts(
        status: SubscriptionStatus,
        grace_end: Option<Timestamp>,
        frozen_at: Option<Timestamp>,
    ) -> Result<Self, ValidationError> {
        match (status, grace_end, frozen_at) {
            (SubscriptionStatus::Active, None, None) => Ok(SubscriptionState::Active),
            (SubscriptionStatus::GracePeriod, Some(grace_end), None) => {
                Ok(SubscriptionState::GracePeriod { grace_end })
            }
            (SubscriptionStatus::Frozen, None, Some(frozen_at)) => {
                Ok(SubscriptionState::Frozen { frozen_at })
            }
            (SubscriptionStatus::Cancelled, None, None) => Ok(SubscriptionState::Cancelled),
            (status, _, _) => Err(ValidationError::invalid_format(
                "subscription_state",
                format!("fields inconsistent with status '{}'", status),
            )),
        }
    }
}
