//! Repository for the `rotation_attempts` audit table.

use keywheel_core::attempt::{TriggerSource, OUTCOME_SUCCESS};
use keywheel_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::attempt::{NewRotationAttempt, RotationAttempt};

/// Column list for `rotation_attempts` queries.
const COLUMNS: &str = "id, attempted_at, status, output, error, snapshot_key, \
                       duration_secs, trigger_source, created_at";

/// Append and query rotation attempts. Rows are never updated or deleted.
pub struct AttemptRepo;

impl AttemptRepo {
    /// Append one attempt, returning the stored row.
    pub async fn insert(
        pool: &PgPool,
        new: &NewRotationAttempt,
    ) -> Result<RotationAttempt, sqlx::Error> {
        let query = format!(
            "INSERT INTO rotation_attempts \
                (attempted_at, status, output, error, snapshot_key, duration_secs, trigger_source) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RotationAttempt>(&query)
            .bind(new.attempted_at)
            .bind(new.outcome.as_str())
            .bind(&new.output)
            .bind(&new.error)
            .bind(new.snapshot_key.as_deref())
            .bind(new.duration_secs)
            .bind(new.trigger.as_str())
            .fetch_one(pool)
            .await
    }

    /// Timestamp of the most recent successful attempt, if any.
    pub async fn last_success_at(pool: &PgPool) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT attempted_at FROM rotation_attempts \
             WHERE status = $1 \
             ORDER BY attempted_at DESC \
             LIMIT 1",
        )
        .bind(OUTCOME_SUCCESS)
        .fetch_optional(pool)
        .await
    }

    /// Most recent attempts, newest first.
    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<RotationAttempt>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rotation_attempts \
             ORDER BY attempted_at DESC, id DESC \
             LIMIT $1"
        );
        sqlx::query_as::<_, RotationAttempt>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Most recent attempts with the given trigger source, newest first.
    pub async fn recent_by_trigger(
        pool: &PgPool,
        trigger: TriggerSource,
        limit: i64,
    ) -> Result<Vec<RotationAttempt>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rotation_attempts \
             WHERE trigger_source = $1 \
             ORDER BY attempted_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, RotationAttempt>(&query)
            .bind(trigger.as_str())
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
