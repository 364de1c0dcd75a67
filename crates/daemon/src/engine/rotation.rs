//! The rotation state machine.
//!
//! One invocation walks: backup the current secrets, invoke the external
//! rotation tool, record the attempt, then prune old snapshots on success or
//! alert on failure. The ordering invariant that everything else hangs off:
//! the external command never runs unless a snapshot of the previous secrets
//! was persisted first.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use keywheel_core::attempt::{RotationOutcome, TriggerSource};
use keywheel_core::runner::CommandRunner;
use keywheel_core::schedule;
use keywheel_core::secrets::{
    self, BackupError, BACKUP_FAILED_ERROR, MIN_KEYS_FOR_BACKUP, SECRET_KEYS,
};
use keywheel_core::snapshot::{next_snapshot_key, SnapshotPayload};
use keywheel_core::types::Timestamp;
use keywheel_db::models::attempt::NewRotationAttempt;
use tokio::sync::Mutex;

use crate::config::RotationConfig;

use super::{AuditSink, FailureNotifier, SnapshotStore};

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// What one `execute` call did.
#[derive(Debug, Clone)]
pub enum RotationRun {
    /// Kill switch active; nothing ran, nothing was recorded.
    Disabled,
    /// Another rotation held the single-flight lock; dropped as a no-op.
    Busy,
    /// A full attempt ran and was recorded.
    Completed(AttemptSummary),
}

/// The recorded shape of one completed attempt.
#[derive(Debug, Clone)]
pub struct AttemptSummary {
    pub outcome: RotationOutcome,
    pub trigger: TriggerSource,
    /// `None` when backup failed before the command could run.
    pub snapshot_key: Option<String>,
    /// Raw merged tool output, empty when the command never ran.
    pub output: String,
    /// Error detail; empty on success.
    pub error: String,
    pub duration_secs: f64,
}

/// What one overdue check decided.
#[derive(Debug, Clone)]
pub enum OverdueCheck {
    /// Kill switch active; nothing was even queried.
    Disabled,
    /// The most recent success is within the staleness window.
    Fresh { last_success_at: Timestamp },
    /// A rotation was due; the contained run is what came of it.
    Triggered(RotationRun),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Orchestrates rotation attempts against pluggable collaborators.
pub struct RotationEngine {
    config: Arc<RotationConfig>,
    snapshots: Arc<dyn SnapshotStore>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn FailureNotifier>,
    runner: Arc<dyn CommandRunner>,
    /// Single-flight guard: overdue checks ride on inbound requests and can
    /// race the scheduled run, so at most one execution may hold this.
    in_flight: Mutex<()>,
}

impl RotationEngine {
    pub fn new(
        config: Arc<RotationConfig>,
        snapshots: Arc<dyn SnapshotStore>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn FailureNotifier>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            snapshots,
            audit,
            notifier,
            runner,
            in_flight: Mutex::new(()),
        }
    }

    /// Run one full rotation attempt.
    ///
    /// Every failure mode is recovered into a `failure` audit record; this
    /// never returns an error and never panics the caller. There is no
    /// in-call retry: recovery is the next scheduled or overdue trigger.
    pub async fn execute(&self, trigger: TriggerSource) -> RotationRun {
        if self.config.disabled {
            tracing::info!(trigger = trigger.as_str(), "Rotation disabled; skipping");
            return RotationRun::Disabled;
        }

        // try_lock, not lock: the loser of a race must be dropped, not
        // queued behind the winner as a second back-to-back rotation.
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::warn!(
                trigger = trigger.as_str(),
                "Rotation already in flight; dropping trigger"
            );
            return RotationRun::Busy;
        };

        let attempted_at = Utc::now();
        let started = Instant::now();
        tracing::info!(trigger = trigger.as_str(), "Rotation starting");

        let snapshot_key = match self.backup(attempted_at).await {
            Ok(key) => key,
            Err(cause) => {
                // The audit row carries the fixed "Backup failed" marker;
                // the concrete cause goes to the log only.
                tracing::warn!(error = %cause, "Backup failed; command not invoked");
                let summary = AttemptSummary {
                    outcome: RotationOutcome::Failure,
                    trigger,
                    snapshot_key: None,
                    output: String::new(),
                    error: BACKUP_FAILED_ERROR.to_string(),
                    duration_secs: started.elapsed().as_secs_f64(),
                };
                self.record(attempted_at, &summary).await;
                return RotationRun::Completed(summary);
            }
        };

        let run = self
            .runner
            .run(&self.config.command, &self.config.command_args)
            .await;
        let duration_secs = started.elapsed().as_secs_f64();

        let summary = AttemptSummary {
            outcome: if run.succeeded() {
                RotationOutcome::Success
            } else {
                RotationOutcome::Failure
            },
            trigger,
            snapshot_key: Some(snapshot_key),
            error: run.error_detail(),
            output: run.output,
            duration_secs,
        };
        self.record(attempted_at, &summary).await;

        match summary.outcome {
            RotationOutcome::Success => {
                tracing::info!(duration_secs, "Rotation succeeded");
                match self.snapshots.prune(self.config.retention).await {
                    Ok(deleted) if deleted > 0 => {
                        let keep = self.config.retention;
                        tracing::info!(deleted, keep, "Pruned old snapshots");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Snapshot pruning failed"),
                }
            }
            RotationOutcome::Failure => {
                tracing::warn!(error = %summary.error, duration_secs, "Rotation failed");
                if self.config.notify_on_failure {
                    self.notifier
                        .send_failure_alert(&summary.error, &summary.output)
                        .await;
                }
            }
        }

        RotationRun::Completed(summary)
    }

    /// Run a rotation if the most recent success is missing or stale.
    ///
    /// This is the self-healing path for a missed scheduled run. Cheap when
    /// fresh (one indexed query), so it is safe to call on every inbound
    /// request. An unreadable audit log counts as no recorded success.
    pub async fn run_if_overdue(&self) -> OverdueCheck {
        if self.config.disabled {
            return OverdueCheck::Disabled;
        }

        let last_success = match self.audit.last_success_at().await {
            Ok(last) => last,
            Err(e) => {
                tracing::error!(error = %e, "Last-success query failed; treating as overdue");
                None
            }
        };

        let now = Utc::now();
        if let Some(at) = last_success {
            if !schedule::is_overdue(Some(at), now) {
                return OverdueCheck::Fresh { last_success_at: at };
            }
        }

        tracing::info!(last_success_at = ?last_success, "Rotation overdue; running fallback");
        OverdueCheck::Triggered(self.execute(TriggerSource::OverdueFallback).await)
    }

    /// Snapshot the current secrets, returning the persisted snapshot key.
    async fn backup(&self, captured_at: Timestamp) -> Result<String, BackupError> {
        let (source, raw) = secrets::read_first_readable(&self.config.secrets_candidates).await?;

        let values = secrets::extract_secrets(&raw, SECRET_KEYS);
        if values.len() < MIN_KEYS_FOR_BACKUP {
            return Err(BackupError::InsufficientSecrets {
                found: values.len(),
                required: MIN_KEYS_FOR_BACKUP,
            });
        }
        tracing::debug!(
            source = %source.display(),
            keys = values.len(),
            "Secrets extracted for snapshot"
        );

        let key = next_snapshot_key(captured_at);
        let payload = SnapshotPayload {
            values,
            captured_at,
        };
        self.snapshots
            .save(&key, &payload)
            .await
            .map_err(|e| BackupError::PersistFailure(e.to_string()))?;
        Ok(key)
    }

    /// Append the attempt to the audit log. Append failures are logged, not
    /// propagated: a rotation outcome must not change because recording it
    /// failed.
    async fn record(&self, attempted_at: Timestamp, summary: &AttemptSummary) {
        let attempt = NewRotationAttempt {
            attempted_at,
            outcome: summary.outcome,
            output: summary.output.clone(),
            error: summary.error.clone(),
            snapshot_key: summary.snapshot_key.clone(),
            duration_secs: summary.duration_secs,
            trigger: summary.trigger,
        };
        if let Err(e) = self.audit.append(&attempt).await {
            tracing::error!(error = %e, "Audit append failed; attempt not recorded");
        }
    }
}
