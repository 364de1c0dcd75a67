//! Repository for the `secret_snapshots` backup store.
//!
//! Write-once by design: snapshots are inserted, enumerated, counted, and
//! pruned, but their payloads are never read back by the service. Restoring
//! from a snapshot is an operator action directly against the table.

use keywheel_core::types::Timestamp;
use sqlx::PgPool;

/// Save, enumerate, and prune secret snapshots.
pub struct SnapshotRepo;

impl SnapshotRepo {
    /// Persist one snapshot under `key`.
    ///
    /// `key` is the primary key; inserting a duplicate is an error, which
    /// the caller surfaces as a failed backup.
    pub async fn insert(
        pool: &PgPool,
        key: &str,
        payload: &serde_json::Value,
        captured_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO secret_snapshots (snapshot_key, payload, captured_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(key)
        .bind(payload)
        .bind(captured_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// All snapshot keys, most recent capture first.
    pub async fn list_keys(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT snapshot_key FROM secret_snapshots \
             ORDER BY captured_at DESC, snapshot_key DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Number of stored snapshots.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM secret_snapshots")
            .fetch_one(pool)
            .await
    }

    /// Delete every snapshot beyond the `keep` most recent, returning the
    /// number deleted. No-op when the count is already within `keep`;
    /// `keep = 0` deletes everything.
    pub async fn prune(pool: &PgPool, keep: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM secret_snapshots WHERE snapshot_key IN ( \
                 SELECT snapshot_key FROM secret_snapshots \
                 ORDER BY captured_at DESC, snapshot_key DESC \
                 OFFSET $1 \
             )",
        )
        .bind(keep.max(0))
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
