//! Paystack payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for Paystack, including:
//! - Charge initialization with vendor metadata
//! - Webhook signature verification and payload parsing
//! - Bank account resolution and a cached bank list
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA512 with constant-time comparison
//! - Secrets are handled via `secrecy::SecretString`

mod mock_gateway;
mod paystack_adapter;
pub mod signature;
mod webhook_types;

pub use mock_gateway::MockGateway;
pub use paystack_adapter::{PaystackConfig, PaystackGateway};
pub use signature::SIGNATURE_HEADER;
pub use webhook_types::parse_webhook;
