//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `billing` - Subscription lifecycle, notifications and the billing state machine

pub mod billing;
pub mod foundation;
