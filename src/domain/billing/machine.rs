//! Billing state machine.
//!
//! `BillingStateMachine::apply` is the only place subscription records change
//! shape. It is pure: callers hand it the current record, an event and the
//! clock, and get back the next record plus whatever side effects (emails,
//! store visibility) the transition asks for. It never fails. Combinations
//! that make no sense for the current status come back unchanged so a batch
//! run cannot be aborted by an unexpected record.

use serde::Serialize;

use crate::domain::foundation::{StateMachine, Timestamp};

use super::{
    BillingEvent, BillingPolicy, Notification, NotificationKey, NotificationKind, PaymentReceipt,
    PeriodKey, StoreVisibility, SubscriptionRecord, SubscriptionState,
};

/// What a transition did, for logging and job counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// Record unchanged, nothing to persist or send.
    Unchanged,
    /// Only the tick date moved.
    TickRecorded,
    /// Active record paid for another cycle.
    Renewed,
    /// Grace or frozen record back to active.
    Reactivated,
    ExpiryWarned,
    GraceEntered,
    GraceReminded,
    Frozen,
    /// Already frozen; the freeze notice was re-emitted.
    FrozenReminded,
    Cancelled,
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub record: SubscriptionRecord,
    pub notifications: Vec<Notification>,
    pub visibility: Option<StoreVisibility>,
    pub outcome: TransitionOutcome,
}

impl Transition {
    fn unchanged(record: &SubscriptionRecord) -> Self {
        Self {
            record: record.clone(),
            notifications: Vec::new(),
            visibility: None,
            outcome: TransitionOutcome::Unchanged,
        }
    }

    /// True when applying this transition to `original` needs a write.
    pub fn requires_write(&self, original: &SubscriptionRecord) -> bool {
        self.visibility.is_some() || self.record != *original
    }
}

/// Pure decision logic for subscription records.
#[derive(Debug, Clone, Copy, Default)]
pub struct BillingStateMachine {
    policy: BillingPolicy,
}

impl BillingStateMachine {
    pub fn new(policy: BillingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    /// Computes the next record for `event` at `now`.
    pub fn apply(
        &self,
        record: &SubscriptionRecord,
        event: &BillingEvent,
        now: Timestamp,
    ) -> Transition {
        let transition = match event {
            BillingEvent::PaymentSucceeded(receipt) => self.on_payment(record, receipt, now),
            BillingEvent::PaymentFailed(_) | BillingEvent::PaymentDisputed(_) => {
                Transition::unchanged(record)
            }
            BillingEvent::Tick => self.on_tick(record, now),
            BillingEvent::Freeze => self.on_freeze(record, now),
            BillingEvent::Reactivate(receipt) => self.on_reactivate(record, receipt, now),
            BillingEvent::Cancel => self.on_cancel(record),
        };

        debug_assert!(
            transition.record.status() == record.status()
                || record.status().can_transition_to(&transition.record.status()),
            "illegal transition {:?} -> {:?}",
            record.status(),
            transition.record.status()
        );
        transition
    }

    fn on_payment(
        &self,
        record: &SubscriptionRecord,
        receipt: &PaymentReceipt,
        now: Timestamp,
    ) -> Transition {
        if record.state == SubscriptionState::Cancelled || record.has_processed(&receipt.reference) {
            return Transition::unchanged(record);
        }

        let was_active = record.state == SubscriptionState::Active;
        let mut next = record.clone();
        next.current_period_end = now.max(record.current_period_end).add_days(self.policy.cycle_days);
        next.remember_payment(receipt.reference.clone());
        next.state = SubscriptionState::Active;

        if was_active {
            Transition {
                record: next,
                notifications: Vec::new(),
                visibility: None,
                outcome: TransitionOutcome::Renewed,
            }
        } else {
            self.reactivated(next, now)
        }
    }

    fn on_reactivate(
        &self,
        record: &SubscriptionRecord,
        receipt: &PaymentReceipt,
        now: Timestamp,
    ) -> Transition {
        match record.state {
            SubscriptionState::Cancelled => Transition::unchanged(record),
            SubscriptionState::Active => self.on_payment(record, receipt, now),
            SubscriptionState::GracePeriod { .. } | SubscriptionState::Frozen { .. } => {
                if !record.has_processed(&receipt.reference) {
                    return self.on_payment(record, receipt, now);
                }
                // Payment already applied (e.g. webhook raced an admin freeze):
                // restore access without paying out a second cycle.
                let mut next = record.clone();
                next.state = SubscriptionState::Active;
                self.reactivated(next, now)
            }
        }
    }

    fn reactivated(&self, next: SubscriptionRecord, now: Timestamp) -> Transition {
        let notification = notification(&next, NotificationKind::Reactivated, now);
        Transition {
            record: next,
            notifications: vec![notification],
            visibility: Some(StoreVisibility::Visible),
            outcome: TransitionOutcome::Reactivated,
        }
    }

    fn on_tick(&self, record: &SubscriptionRecord, now: Timestamp) -> Transition {
        let period_end = record.current_period_end;
        let mut next = record.clone();
        next.last_tick_date = Some(now.date());

        match record.state {
            SubscriptionState::Active if now.is_after(&period_end) => {
                next.state = SubscriptionState::GracePeriod {
                    grace_end: period_end.add_days(self.policy.grace_days),
                };
                let warning = notification(&next, NotificationKind::GraceWarning, period_end);
                Transition {
                    record: next,
                    notifications: vec![warning],
                    visibility: None,
                    outcome: TransitionOutcome::GraceEntered,
                }
            }
            SubscriptionState::Active => {
                let window_start = period_end.minus_days(self.policy.warning_days);
                if now.is_before(&window_start) {
                    return tick_recorded(record, next);
                }
                let warning = notification(&next, NotificationKind::ExpiryWarning, period_end);
                Transition {
                    record: next,
                    notifications: vec![warning],
                    visibility: None,
                    outcome: TransitionOutcome::ExpiryWarned,
                }
            }
            SubscriptionState::GracePeriod { grace_end } if now.is_after(&grace_end) => {
                frozen(next, now)
            }
            SubscriptionState::GracePeriod { .. } => {
                // Same period key as on grace entry: the ledger drops it unless
                // the first send never went out.
                let reminder = notification(&next, NotificationKind::GraceWarning, period_end);
                Transition {
                    record: next,
                    notifications: vec![reminder],
                    visibility: None,
                    outcome: TransitionOutcome::GraceReminded,
                }
            }
            SubscriptionState::Frozen { frozen_at } => {
                // Same key as the first freeze notice: the ledger drops it
                // unless that send never went out.
                let reminder = notification(&next, NotificationKind::Frozen, frozen_at);
                Transition {
                    record: next,
                    notifications: vec![reminder],
                    visibility: None,
                    outcome: TransitionOutcome::FrozenReminded,
                }
            }
            SubscriptionState::Cancelled => Transition::unchanged(record),
        }
    }

    fn on_freeze(&self, record: &SubscriptionRecord, now: Timestamp) -> Transition {
        match record.state {
            SubscriptionState::Active | SubscriptionState::GracePeriod { .. } => {
                frozen(record.clone(), now)
            }
            SubscriptionState::Frozen { .. } | SubscriptionState::Cancelled => {
                Transition::unchanged(record)
            }
        }
    }

    fn on_cancel(&self, record: &SubscriptionRecord) -> Transition {
        if record.state == SubscriptionState::Cancelled {
            return Transition::unchanged(record);
        }
        let mut next = record.clone();
        next.state = SubscriptionState::Cancelled;
        Transition {
            record: next,
            notifications: Vec::new(),
            visibility: Some(StoreVisibility::Hidden),
            outcome: TransitionOutcome::Cancelled,
        }
    }
}

/// Freeze notices are keyed on the day of the freeze, so each freeze in a
/// period gets its own email whichever path caused it.
fn frozen(mut next: SubscriptionRecord, frozen_at: Timestamp) -> Transition {
    next.state = SubscriptionState::Frozen { frozen_at };
    let notice = notification(&next, NotificationKind::Frozen, frozen_at);
    Transition {
        record: next,
        notifications: vec![notice],
        visibility: Some(StoreVisibility::Hidden),
        outcome: TransitionOutcome::Frozen,
    }
}

fn tick_recorded(record: &SubscriptionRecord, next: SubscriptionRecord) -> Transition {
    if next == *record {
        return Transition::unchanged(record);
    }
    Transition {
        record: next,
        notifications: Vec::new(),
        visibility: None,
        outcome: TransitionOutcome::TickRecorded,
    }
}

fn notification(record: &SubscriptionRecord, kind: NotificationKind, keyed_on: Timestamp) -> Notification {
    Notification {
        key: NotificationKey {
            vendor_id: record.vendor_id.clone(),
            kind,
            period_key: PeriodKey::of(keyed_on),
        },
        current_period_end: record.current_period_end,
        grace_end: record.grace_end(),
        frozen_at: record.frozen_at(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionStatus;
    use crate::domain::foundation::{PaymentReference, StoreId, VendorId};
    use proptest::prelude::*;

    fn now() -> Timestamp {
        Timestamp::parse_rfc3339("2026-05-20T09:00:00Z").unwrap()
    }

    fn machine() -> BillingStateMachine {
        BillingStateMachine::new(BillingPolicy::default())
    }

    fn record(state: SubscriptionState, period_end: Timestamp) -> SubscriptionRecord {
        let mut record = SubscriptionRecord::new(
            VendorId::new("vendor-1").unwrap(),
            StoreId::new("store-1").unwrap(),
            period_end,
        );
        record.state = state;
        record
    }

    fn paid(reference: &str) -> BillingEvent {
        BillingEvent::PaymentSucceeded(receipt(reference))
    }

    fn receipt(reference: &str) -> PaymentReceipt {
        PaymentReceipt {
            reference: PaymentReference::new(reference).unwrap(),
            amount: 500_000,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payments
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn payment_extends_from_period_end_when_not_yet_expired() {
        let period_end = now().add_days(10);
        let active = record(SubscriptionState::Active, period_end);

        let t = machine().apply(&active, &paid("R1"), now());

        assert_eq!(t.outcome, TransitionOutcome::Renewed);
        assert_eq!(t.record.current_period_end, period_end.add_days(30));
        assert!(t.notifications.is_empty());
        assert!(t.visibility.is_none());
        assert_eq!(
            t.record.last_processed_payment_ref,
            Some(PaymentReference::new("R1").unwrap())
        );
    }

    #[test]
    fn payment_extends_from_now_when_period_already_ended() {
        let active = record(SubscriptionState::Active, now().minus_days(3));

        let t = machine().apply(&active, &paid("R1"), now());

        assert_eq!(t.record.current_period_end, now().add_days(30));
    }

    #[test]
    fn duplicate_payment_reference_is_a_no_op() {
        let active = record(SubscriptionState::Active, now());
        let first = machine().apply(&active, &paid("R1"), now());
        let second = machine().apply(&first.record, &paid("R1"), now().add_days(1));

        assert_eq!(second.outcome, TransitionOutcome::Unchanged);
        assert_eq!(second.record, first.record);
        assert!(second.notifications.is_empty());
    }

    #[test]
    fn late_payment_during_grace_reactivates_and_notifies() {
        let period_end = now().minus_days(2);
        let grace = record(
            SubscriptionState::GracePeriod { grace_end: period_end.add_days(5) },
            period_end,
        );

        let t = machine().apply(&grace, &paid("R2"), now());

        assert_eq!(t.outcome, TransitionOutcome::Reactivated);
        assert_eq!(t.record.state, SubscriptionState::Active);
        assert_eq!(t.record.grace_end(), None);
        assert_eq!(t.visibility, Some(StoreVisibility::Visible));
        assert_eq!(t.notifications.len(), 1);
        assert_eq!(t.notifications[0].kind(), NotificationKind::Reactivated);
        assert_eq!(t.notifications[0].key.period_key, PeriodKey::of(now()));
    }

    #[test]
    fn payment_on_frozen_store_unfreezes_it() {
        let frozen = record(
            SubscriptionState::Frozen { frozen_at: now().minus_days(1) },
            now().minus_days(7),
        );

        let t = machine().apply(&frozen, &paid("R3"), now());

        assert_eq!(t.record.status(), SubscriptionStatus::Active);
        assert_eq!(t.record.frozen_at(), None);
        assert_eq!(t.visibility, Some(StoreVisibility::Visible));
    }

    #[test]
    fn payment_on_cancelled_record_is_ignored() {
        let cancelled = record(SubscriptionState::Cancelled, now());
        let t = machine().apply(&cancelled, &paid("R1"), now());
        assert_eq!(t.outcome, TransitionOutcome::Unchanged);
        assert!(!t.record.has_processed(&PaymentReference::new("R1").unwrap()));
    }

    #[test]
    fn failed_and_disputed_payments_change_nothing() {
        let active = record(SubscriptionState::Active, now());
        for event in [
            BillingEvent::PaymentFailed(receipt("R9")),
            BillingEvent::PaymentDisputed(receipt("R9")),
        ] {
            let t = machine().apply(&active, &event, now());
            assert_eq!(t.outcome, TransitionOutcome::Unchanged);
            assert_eq!(t.record, active);
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Ticks
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn tick_after_period_end_enters_grace() {
        let period_end = now().minus_days(1);
        let active = record(SubscriptionState::Active, period_end);

        let t = machine().apply(&active, &BillingEvent::Tick, now());

        assert_eq!(t.outcome, TransitionOutcome::GraceEntered);
        assert_eq!(
            t.record.state,
            SubscriptionState::GracePeriod { grace_end: period_end.add_days(5) }
        );
        assert_eq!(t.notifications.len(), 1);
        assert_eq!(t.notifications[0].kind(), NotificationKind::GraceWarning);
        assert_eq!(t.notifications[0].key.period_key, PeriodKey::of(period_end));
        assert_eq!(t.record.last_tick_date, Some(now().date()));
    }

    #[test]
    fn tick_inside_warning_window_warns_without_status_change() {
        let active = record(SubscriptionState::Active, now().add_days(2));

        let t = machine().apply(&active, &BillingEvent::Tick, now());

        assert_eq!(t.outcome, TransitionOutcome::ExpiryWarned);
        assert_eq!(t.record.status(), SubscriptionStatus::Active);
        assert_eq!(t.notifications[0].kind(), NotificationKind::ExpiryWarning);
    }

    #[test]
    fn tick_well_before_period_end_only_stamps_date() {
        let active = record(SubscriptionState::Active, now().add_days(20));

        let t = machine().apply(&active, &BillingEvent::Tick, now());

        assert_eq!(t.outcome, TransitionOutcome::TickRecorded);
        assert!(t.notifications.is_empty());
        assert_eq!(t.record.last_tick_date, Some(now().date()));
    }

    #[test]
    fn second_tick_on_same_day_is_unchanged_when_nothing_due() {
        let active = record(SubscriptionState::Active, now().add_days(20));
        let first = machine().apply(&active, &BillingEvent::Tick, now());
        let second = machine().apply(&first.record, &BillingEvent::Tick, now());
        assert_eq!(second.outcome, TransitionOutcome::Unchanged);
    }

    #[test]
    fn tick_after_grace_end_freezes_and_hides_store() {
        let grace = record(
            SubscriptionState::GracePeriod { grace_end: now().minus_days(1) },
            now().minus_days(6),
        );

        let t = machine().apply(&grace, &BillingEvent::Tick, now());

        assert_eq!(t.outcome, TransitionOutcome::Frozen);
        assert_eq!(t.record.state, SubscriptionState::Frozen { frozen_at: now() });
        assert_eq!(t.visibility, Some(StoreVisibility::Hidden));
        assert_eq!(t.notifications.len(), 1);
        assert_eq!(t.notifications[0].kind(), NotificationKind::Frozen);
        assert_eq!(t.notifications[0].key.period_key, PeriodKey::of(now()));
    }

    #[test]
    fn tick_during_grace_reemits_same_grace_warning_key() {
        let period_end = now().minus_days(2);
        let grace = record(
            SubscriptionState::GracePeriod { grace_end: period_end.add_days(5) },
            period_end,
        );

        let t = machine().apply(&grace, &BillingEvent::Tick, now());

        assert_eq!(t.outcome, TransitionOutcome::GraceReminded);
        assert_eq!(t.record.status(), SubscriptionStatus::GracePeriod);
        assert_eq!(t.notifications[0].key.period_key, PeriodKey::of(period_end));
    }

    #[test]
    fn tick_on_frozen_reemits_the_freeze_notice() {
        let frozen_at = now().minus_days(3);
        let frozen = record(SubscriptionState::Frozen { frozen_at }, now().minus_days(40));

        let t = machine().apply(&frozen, &BillingEvent::Tick, now());

        assert_eq!(t.outcome, TransitionOutcome::FrozenReminded);
        assert_eq!(t.record.state, frozen.state);
        assert_eq!(t.record.last_tick_date, Some(now().date()));
        assert!(t.visibility.is_none());
        assert_eq!(t.notifications.len(), 1);
        assert_eq!(t.notifications[0].kind(), NotificationKind::Frozen);
        assert_eq!(t.notifications[0].key.period_key, PeriodKey::of(frozen_at));
    }

    #[test]
    fn freeze_notice_key_is_the_same_on_freeze_and_later_ticks() {
        let grace = record(
            SubscriptionState::GracePeriod { grace_end: now().minus_days(1) },
            now().minus_days(6),
        );
        let freeze = machine().apply(&grace, &BillingEvent::Tick, now());
        let later = machine().apply(&freeze.record, &BillingEvent::Tick, now().add_days(2));

        assert_eq!(later.notifications[0].key, freeze.notifications[0].key);
    }

    #[test]
    fn tick_on_cancelled_is_a_no_op() {
        let cancelled = record(SubscriptionState::Cancelled, now().minus_days(40));
        let t = machine().apply(&cancelled, &BillingEvent::Tick, now());
        assert_eq!(t.outcome, TransitionOutcome::Unchanged);
        assert_eq!(t.record, cancelled);
        assert!(t.notifications.is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Admin overrides
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn freeze_forces_active_record_frozen() {
        let active = record(SubscriptionState::Active, now().add_days(10));

        let t = machine().apply(&active, &BillingEvent::Freeze, now());

        assert_eq!(t.record.frozen_at(), Some(now()));
        assert_eq!(t.visibility, Some(StoreVisibility::Hidden));
        assert_eq!(t.record.current_period_end, active.current_period_end);
    }

    #[test]
    fn freeze_leaves_cancelled_and_frozen_alone() {
        for state in [
            SubscriptionState::Cancelled,
            SubscriptionState::Frozen { frozen_at: now().minus_days(1) },
        ] {
            let subject = record(state, now());
            let t = machine().apply(&subject, &BillingEvent::Freeze, now());
            assert_eq!(t.outcome, TransitionOutcome::Unchanged);
        }
    }

    #[test]
    fn reactivate_with_already_applied_reference_does_not_extend_twice() {
        let active = record(SubscriptionState::Active, now());
        let paid_once = machine().apply(&active, &paid("R1"), now()).record;
        let frozen = machine().apply(&paid_once, &BillingEvent::Freeze, now()).record;

        let t = machine().apply(&frozen, &BillingEvent::Reactivate(receipt("R1")), now());

        assert_eq!(t.outcome, TransitionOutcome::Reactivated);
        assert_eq!(t.record.status(), SubscriptionStatus::Active);
        assert_eq!(t.record.current_period_end, paid_once.current_period_end);
    }

    #[test]
    fn repeated_overrides_in_one_period_get_their_own_notices() {
        let active = record(SubscriptionState::Active, now());
        let paid_once = machine().apply(&active, &paid("R1"), now()).record;
        let reactivate = BillingEvent::Reactivate(receipt("R1"));

        let first_freeze = machine().apply(&paid_once, &BillingEvent::Freeze, now());
        let first_back = machine().apply(&first_freeze.record, &reactivate, now());
        let next_day = now().add_days(1);
        let second_freeze = machine().apply(&first_back.record, &BillingEvent::Freeze, next_day);
        let second_back = machine().apply(&second_freeze.record, &reactivate, next_day);

        assert_eq!(second_back.record.current_period_end, paid_once.current_period_end);
        assert_ne!(
            first_freeze.notifications[0].key,
            second_freeze.notifications[0].key
        );
        assert_ne!(
            first_back.notifications[0].key,
            second_back.notifications[0].key
        );
        assert_eq!(second_freeze.notifications[0].key.period_key, PeriodKey::of(next_day));
        assert_eq!(second_back.notifications[0].key.period_key, PeriodKey::of(next_day));
    }

    #[test]
    fn reactivate_with_new_reference_extends_period() {
        let frozen = record(
            SubscriptionState::Frozen { frozen_at: now().minus_days(2) },
            now().minus_days(10),
        );

        let t = machine().apply(&frozen, &BillingEvent::Reactivate(receipt("R5")), now());

        assert_eq!(t.record.current_period_end, now().add_days(30));
        assert!(t.record.has_processed(&PaymentReference::new("R5").unwrap()));
    }

    #[test]
    fn cancel_is_terminal_and_hides_store() {
        let grace = record(
            SubscriptionState::GracePeriod { grace_end: now().add_days(1) },
            now().minus_days(4),
        );

        let t = machine().apply(&grace, &BillingEvent::Cancel, now());
        assert_eq!(t.record.state, SubscriptionState::Cancelled);
        assert_eq!(t.visibility, Some(StoreVisibility::Hidden));
        assert!(t.notifications.is_empty());

        let again = machine().apply(&t.record, &BillingEvent::Cancel, now());
        assert_eq!(again.outcome, TransitionOutcome::Unchanged);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Properties
    // ════════════════════════════════════════════════════════════════════════════

    fn arb_state() -> impl Strategy<Value = SubscriptionState> {
        prop_oneof![
            Just(SubscriptionState::Active),
            (-20i64..20).prop_map(|d| SubscriptionState::GracePeriod { grace_end: now().add_days(d) }),
            (-20i64..0).prop_map(|d| SubscriptionState::Frozen { frozen_at: now().add_days(d) }),
            Just(SubscriptionState::Cancelled),
        ]
    }

    fn arb_reference() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("R1"), Just("R2"), Just("R3")]
    }

    fn arb_event() -> impl Strategy<Value = BillingEvent> {
        prop_oneof![
            arb_reference().prop_map(paid),
            arb_reference().prop_map(|r| BillingEvent::PaymentFailed(receipt(r))),
            Just(BillingEvent::Tick),
            Just(BillingEvent::Freeze),
            arb_reference().prop_map(|r| BillingEvent::Reactivate(receipt(r))),
            Just(BillingEvent::Cancel),
        ]
    }

    proptest! {
        #[test]
        fn status_data_always_matches_tag(
            state in arb_state(),
            offset in -60i64..60,
            events in prop::collection::vec((arb_event(), 0i64..10), 1..12),
        ) {
            let mut current = record(state, now().add_days(offset));
            let mut clock = now();
            for (event, step) in events {
                clock = clock.add_days(step);
                current = machine().apply(&current, &event, clock).record;
                prop_assert_eq!(
                    current.grace_end().is_some(),
                    current.status() == SubscriptionStatus::GracePeriod
                );
                prop_assert_eq!(
                    current.frozen_at().is_some(),
                    current.status() == SubscriptionStatus::Frozen
                );
            }
        }

        #[test]
        fn period_end_only_moves_forward_on_new_references(
            state in arb_state(),
            offset in -60i64..60,
            events in prop::collection::vec((arb_event(), 0i64..10), 1..12),
        ) {
            let mut current = record(state, now().add_days(offset));
            let mut clock = now();
            for (event, step) in events {
                clock = clock.add_days(step);
                let next = machine().apply(&current, &event, clock).record;
                prop_assert!(!next.current_period_end.is_before(&current.current_period_end));
                if next.current_period_end != current.current_period_end {
                    prop_assert_ne!(&next.last_processed_payment_ref, &current.last_processed_payment_ref);
                }
                current = next;
            }
        }

        #[test]
        fn transitions_follow_status_graph(state in arb_state(), event in arb_event()) {
            let before = record(state, now());
            let after = machine().apply(&before, &event, now()).record;
            prop_assert!(
                before.status() == after.status()
                    || before.status().can_transition_to(&after.status())
            );
        }

        #[test]
        fn applying_same_payment_twice_equals_applying_once(
            state in arb_state(),
            offset in -60i64..60,
        ) {
            let start = record(state, now().add_days(offset));
            let once = machine().apply(&start, &paid("R1"), now());
            let twice = machine().apply(&once.record, &paid("R1"), now());
            prop_assert_eq!(&twice.record, &once.record);
            prop_assert!(twice.notifications.is_empty());
            prop_assert!(once.notifications.len() <= 1);
        }
    }
}
