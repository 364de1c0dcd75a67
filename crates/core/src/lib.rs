//! Keywheel domain logic.
//!
//! Everything here is independent of the database and the HTTP surface:
//!
//! - [`secrets`] — locating and parsing the secret configuration file.
//! - [`snapshot`] — time-derived snapshot keys and the backup payload.
//! - [`runner`] — the external rotation command, with output-based
//!   success classification.
//! - [`attempt`] — rotation attempt outcome and trigger-source enums.
//! - [`schedule`] — overdue detection and daily fire-time computation.

pub mod attempt;
pub mod error;
pub mod runner;
pub mod schedule;
pub mod secrets;
pub mod snapshot;
pub mod types;

pub use attempt::{RotationOutcome, TriggerSource};
pub use error::CoreError;
pub use runner::{CommandRunner, ProcessRunner, RunFailure, RunOutcome};
pub use secrets::BackupError;
pub use snapshot::SnapshotPayload;
