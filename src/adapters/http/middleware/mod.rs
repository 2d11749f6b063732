//! HTTP middleware for axum.
//!
//! This module contains middleware layers for cross-cutting concerns:
//!
//! - `auth` - Shared-secret checks for job and admin endpoints

pub mod auth;

pub use auth::{cron_auth_middleware, secrets_match, SharedSecrets};
