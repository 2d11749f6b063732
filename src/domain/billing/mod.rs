//! Billing domain module.
//!
//! Subscription lifecycle of vendor stores: payments, grace periods,
//! freezing, and the notifications those transitions emit.
//!
//! # Module Structure
//!
//! - `status` - SubscriptionStatus state machine and status-carrying state
//! - `record` - SubscriptionRecord and the fields a conditional update writes
//! - `event` - Payment and billing events
//! - `policy` - Cycle, grace and warning lengths
//! - `notification` - Notification kinds, dedupe keys and ledger rows
//! - `machine` - Pure transition function
//! - `errors` - Billing error taxonomy

mod errors;
mod event;
mod machine;
mod notification;
mod policy;
mod record;
mod status;

pub use errors::BillingError;
pub use event::{BillingEvent, PaymentEvent, PaymentEventKind, PaymentReceipt};
pub use machine::{BillingStateMachine, Transition, TransitionOutcome};
pub use notification::{
    DeliveryStatus, Notification, NotificationKey, NotificationKind, NotificationRecord, PeriodKey,
};
pub use policy::BillingPolicy;
pub use record::{
    StoreVisibility, SubscriptionFields, SubscriptionRecord, MAX_REMEMBERED_PAYMENT_REFS,
};
pub use status::{SubscriptionState, SubscriptionStatus};
