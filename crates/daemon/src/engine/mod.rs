//! Rotation engine and its collaborator seams.
//!
//! The engine drives one rotation attempt end to end: snapshot the current
//! secrets, invoke the external tool, record the outcome, clean up or alert.
//! It talks to persistence and alerting through narrow traits so the
//! orchestration logic is testable with in-memory fakes; production adapters
//! wrap the sqlx repositories and the notify channels.

use async_trait::async_trait;
use keywheel_core::snapshot::SnapshotPayload;
use keywheel_core::types::Timestamp;
use keywheel_db::models::attempt::NewRotationAttempt;

pub mod adapters;
pub mod rotation;

pub use adapters::{FailureAlerts, PgAuditSink, PgSnapshotStore};
pub use rotation::{AttemptSummary, OverdueCheck, RotationEngine, RotationRun};

/// Persistence failure from a snapshot store or audit sink.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Write side of the snapshot backup store.
///
/// Snapshots are write-once: the engine saves and prunes, never reads one
/// back. Restores are an operator action on the underlying table.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist one snapshot under `key`.
    async fn save(&self, key: &str, payload: &SnapshotPayload) -> Result<(), StoreError>;

    /// Delete every snapshot beyond the `keep` most recent; returns how many
    /// were deleted.
    async fn prune(&self, keep: i64) -> Result<u64, StoreError>;
}

/// Append-only audit log of rotation attempts.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, attempt: &NewRotationAttempt) -> Result<(), StoreError>;

    async fn last_success_at(&self) -> Result<Option<Timestamp>, StoreError>;
}

/// Failure alerting. Delivery is best-effort; implementations log their own
/// channel errors rather than surfacing them to the engine.
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn send_failure_alert(&self, error: &str, output: &str);
}
