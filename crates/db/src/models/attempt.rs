//! Rotation attempt entity model and insert DTO.
//!
//! The audit trail is append-only: rows are never updated or deleted, so
//! there is no `updated_at` column and no update DTO.

use keywheel_core::attempt::{RotationOutcome, TriggerSource};
use keywheel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `rotation_attempts` table. Immutable once created.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RotationAttempt {
    pub id: DbId,
    /// When the engine invocation started (not when the row was written).
    pub attempted_at: Timestamp,
    /// `success` or `failure`.
    pub status: String,
    /// Raw merged tool output, possibly empty.
    pub output: String,
    /// Error detail; empty on success.
    pub error: String,
    /// Snapshot backing this attempt; `None` when backup failed first.
    pub snapshot_key: Option<String>,
    pub duration_secs: f64,
    /// `scheduled`, `overdue-fallback`, or `manual`.
    pub trigger_source: String,
    pub created_at: Timestamp,
}

/// Insert payload for a new audit row.
#[derive(Debug, Clone)]
pub struct NewRotationAttempt {
    pub attempted_at: Timestamp,
    pub outcome: RotationOutcome,
    pub output: String,
    pub error: String,
    pub snapshot_key: Option<String>,
    pub duration_secs: f64,
    pub trigger: TriggerSource,
}
