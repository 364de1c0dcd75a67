//! Production adapters binding the engine seams to Postgres and the alert
//! channels.

use async_trait::async_trait;
use keywheel_core::snapshot::SnapshotPayload;
use keywheel_core::types::Timestamp;
use keywheel_db::models::attempt::NewRotationAttempt;
use keywheel_db::repositories::attempt_repo::AttemptRepo;
use keywheel_db::repositories::snapshot_repo::SnapshotRepo;
use keywheel_db::DbPool;
use keywheel_notify::{EmailAlert, EmailConfig, WebhookAlert};

use super::{AuditSink, FailureNotifier, SnapshotStore, StoreError};

// ---------------------------------------------------------------------------
// Postgres stores
// ---------------------------------------------------------------------------

/// Snapshot store backed by the `secret_snapshots` table.
pub struct PgSnapshotStore {
    pool: DbPool,
}

impl PgSnapshotStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn save(&self, key: &str, payload: &SnapshotPayload) -> Result<(), StoreError> {
        let value = serde_json::to_value(payload)
            .map_err(|e| StoreError::Unavailable(format!("snapshot payload serialization: {e}")))?;
        SnapshotRepo::insert(&self.pool, key, &value, payload.captured_at).await?;
        Ok(())
    }

    async fn prune(&self, keep: i64) -> Result<u64, StoreError> {
        Ok(SnapshotRepo::prune(&self.pool, keep).await?)
    }
}

/// Audit sink backed by the `rotation_attempts` table.
pub struct PgAuditSink {
    pool: DbPool,
}

impl PgAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, attempt: &NewRotationAttempt) -> Result<(), StoreError> {
        AttemptRepo::insert(&self.pool, attempt).await?;
        Ok(())
    }

    async fn last_success_at(&self) -> Result<Option<Timestamp>, StoreError> {
        Ok(AttemptRepo::last_success_at(&self.pool).await?)
    }
}

// ---------------------------------------------------------------------------
// Alert fan-out
// ---------------------------------------------------------------------------

/// Fan-out notifier over every configured alert channel.
///
/// Channels missing their configuration are skipped. Channel delivery errors
/// are logged here and never reach the engine.
pub struct FailureAlerts {
    email: Option<EmailAlert>,
    webhook: Option<WebhookAlert>,
}

impl FailureAlerts {
    /// Assemble from environment: email when `SMTP_HOST` and `ALERT_EMAIL`
    /// are set, webhook when `ALERT_WEBHOOK_URL` is set.
    pub fn from_env() -> Self {
        let email = EmailConfig::from_env().map(EmailAlert::new);
        let webhook = std::env::var("ALERT_WEBHOOK_URL")
            .ok()
            .map(WebhookAlert::new);

        if email.is_none() && webhook.is_none() {
            tracing::warn!("No alert channel configured; rotation failures will only be logged");
        }

        Self { email, webhook }
    }
}

#[async_trait]
impl FailureNotifier for FailureAlerts {
    async fn send_failure_alert(&self, error: &str, output: &str) {
        if let Some(email) = &self.email {
            if let Err(e) = email.send_failure_alert(error, output).await {
                tracing::error!(error = %e, "Email alert delivery failed");
            }
        }
        if let Some(webhook) = &self.webhook {
            if let Err(e) = webhook.send_failure_alert(error, output).await {
                tracing::error!(error = %e, "Webhook alert delivery failed");
            }
        }
    }
}
