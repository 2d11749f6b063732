//! Vendor Billing - subscription billing for marketplace vendors.
//!
//! This crate tracks each vendor's subscription through active, grace period,
//! frozen and cancelled states. Payment webhooks renew or reactivate a
//! subscription; a daily reconciliation job moves lapsed vendors into grace
//! and then freezes their stores, sending each notification exactly once.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
