//! Failure alert channels.
//!
//! When a rotation fails, the engine fans the alert out to every configured
//! channel:
//!
//! - [`EmailAlert`] — plain-text email over SMTP (`lettre`).
//! - [`WebhookAlert`] — JSON POST to an operator endpoint (`reqwest`).
//!
//! Both are best-effort from the engine's point of view: a delivery error
//! is logged by the caller, never propagated into the rotation outcome.

pub mod email;
pub mod webhook;

pub use email::{EmailAlert, EmailConfig, EmailError};
pub use webhook::{WebhookAlert, WebhookError};
