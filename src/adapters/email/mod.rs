//! Email notification adapters.
//!
//! `ResendDispatcher` delivers billing emails through the Resend HTTP API.
//! `RecordingDispatcher` keeps sends in memory for tests and local runs.

mod recording_dispatcher;
mod resend_dispatcher;
mod templates;

pub use recording_dispatcher::{RecordingDispatcher, SentEmail};
pub use resend_dispatcher::{ResendConfig, ResendDispatcher};
pub use templates::{render, RenderedEmail};
