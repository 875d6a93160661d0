//! Delivery of final answers for Dayloop.
//!
//! A finished run produces one answer. Notifiers hand it to whoever is
//! listening; the agent loop never depends on delivery succeeding.
//!
//! Available notifiers:
//! - **Webhook**: `POST {"text": answer}` to a configured HTTP endpoint

pub mod webhook;

pub use webhook::{OutputPayload, WebhookNotifier};
