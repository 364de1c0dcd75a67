//! Integration tests for the HTTP surface.
//!
//! Most tests run the real router over engine fakes and a lazily connecting
//! pool, so no database is needed; the two audit-state tests at the bottom
//! need a live PostgreSQL instance and are ignored by default.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{
    body_json, build_test_app, get, post, rotation_config, secrets_file_with_keys,
    unreachable_pool, MemoryAudit, TestEngine,
};
use keywheel_core::attempt::{RotationOutcome, TriggerSource};
use keywheel_core::runner::{RunFailure, RunOutcome};
use keywheel_core::snapshot::SNAPSHOT_KEY_PREFIX;
use keywheel_core::types::Timestamp;
use keywheel_db::models::attempt::NewRotationAttempt;
use keywheel_db::repositories::attempt_repo::AttemptRepo;
use keywheel_db::repositories::snapshot_repo::SnapshotRepo;
use sqlx::PgPool;

const TOOL_SUCCESS: &str = "Success: Shuffled the salt keys.";

/// An engine whose audit log carries a recent success, so the overdue watch
/// riding on every request stays quiet during the test.
fn quiet_engine(outcome: RunOutcome) -> TestEngine {
    TestEngine::with_audit(
        outcome,
        Arc::new(MemoryAudit::with_success_at(Utc::now() - Duration::hours(1))),
    )
}

// ---------------------------------------------------------------------------
// Test: GET /health degrades without a database
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_degraded_without_database() {
    let t = quiet_engine(RunOutcome::success(TOOL_SUCCESS));
    let app = build_test_app(unreachable_pool(), &t);

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["db_healthy"], false);
    assert!(json["version"].is_string());
}

// ---------------------------------------------------------------------------
// Test: unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let t = quiet_engine(RunOutcome::success(TOOL_SUCCESS));
    let app = build_test_app(unreachable_pool(), &t);

    let response = get(app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: POST /api/v1/rotation/run reports the completed attempt
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manual_run_reports_the_completed_attempt() {
    let t = quiet_engine(RunOutcome::success(TOOL_SUCCESS));
    let app = build_test_app(unreachable_pool(), &t);

    let response = post(app, "/api/v1/rotation/run").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["result"], "completed");

    let attempt = &json["data"]["attempt"];
    assert_eq!(attempt["outcome"], "success");
    assert_eq!(attempt["trigger_source"], "manual");
    assert_eq!(attempt["output"], TOOL_SUCCESS);
    assert!(attempt["error"].is_null(), "no error field on success");
    assert!(attempt["duration_secs"].is_number());
    let key = attempt["snapshot_key"].as_str().expect("snapshot key");
    assert!(key.starts_with(SNAPSHOT_KEY_PREFIX));

    assert_eq!(t.runner.calls(), 1);
    assert_eq!(t.snapshots.count(), 1);
    assert_eq!(t.audit.rows().len(), 2, "the seeded row plus the manual run");
}

// ---------------------------------------------------------------------------
// Test: failed run surfaces the error detail
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_run_surfaces_the_error_detail() {
    let t = quiet_engine(RunOutcome::failure(
        "rotation refused",
        RunFailure::CommandFailure,
    ));
    let app = build_test_app(unreachable_pool(), &t);

    let response = post(app, "/api/v1/rotation/run").await;
    assert_eq!(response.status(), StatusCode::OK, "failures are a payload, not a 5xx");

    let json = body_json(response).await;
    let attempt = &json["data"]["attempt"];
    assert_eq!(attempt["outcome"], "failure");
    assert_eq!(attempt["error"], "command output contained no success marker");
    assert_eq!(t.notifier.alerts().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: kill switch surfaces as "disabled"
// ---------------------------------------------------------------------------

#[tokio::test]
async fn kill_switch_reports_disabled() {
    let secrets = secrets_file_with_keys(8);
    let mut config = rotation_config(secrets.path());
    config.disabled = true;
    let t = TestEngine::with_config(config, RunOutcome::success(TOOL_SUCCESS), Some(secrets));
    let app = build_test_app(unreachable_pool(), &t);

    let response = post(app, "/api/v1/rotation/run").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["result"], "disabled");
    assert!(json["data"]["attempt"].is_null());

    assert_eq!(t.runner.calls(), 0);
    assert!(t.audit.rows().is_empty());
}

// ---------------------------------------------------------------------------
// Test: status validates its query parameters before touching the database
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_rejects_out_of_range_limits() {
    let t = quiet_engine(RunOutcome::success(TOOL_SUCCESS));
    let app = build_test_app(unreachable_pool(), &t);

    let response = get(app.clone(), "/api/v1/rotation/status?limit=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "limit must be between 1 and 100");

    let response = get(app, "/api/v1/rotation/status?limit=101").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_rejects_an_unknown_trigger_filter() {
    let t = quiet_engine(RunOutcome::success(TOOL_SUCCESS));
    let app = build_test_app(unreachable_pool(), &t);

    let response = get(app, "/api/v1/rotation/status?trigger=cron").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(
        json["error"]
            .as_str()
            .expect("error message")
            .contains("Unknown trigger source"),
    );
}

// ---------------------------------------------------------------------------
// Test: status with an unreachable database returns a sanitized 500
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_without_database_returns_sanitized_500() {
    let t = quiet_engine(RunOutcome::success(TOOL_SUCCESS));
    let app = build_test_app(unreachable_pool(), &t);

    let response = get(app, "/api/v1/rotation/status").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: status reflects the audit log and snapshot store (live database)
// ---------------------------------------------------------------------------

fn audit_row(
    outcome: RotationOutcome,
    trigger: TriggerSource,
    attempted_at: Timestamp,
) -> NewRotationAttempt {
    NewRotationAttempt {
        attempted_at,
        outcome,
        output: TOOL_SUCCESS.to_string(),
        error: String::new(),
        snapshot_key: Some("secret_snapshot_0000000001_000001".to_string()),
        duration_secs: 1.25,
        trigger,
    }
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn status_reflects_the_audit_state(pool: PgPool) {
    let now = Utc::now();
    let success = audit_row(
        RotationOutcome::Success,
        TriggerSource::Scheduled,
        now - Duration::hours(2),
    );
    AttemptRepo::insert(&pool, &success).await.expect("insert success");
    let mut failure = audit_row(
        RotationOutcome::Failure,
        TriggerSource::Manual,
        now - Duration::hours(1),
    );
    failure.error = "timed out".to_string();
    AttemptRepo::insert(&pool, &failure).await.expect("insert failure");

    let payload = serde_json::json!({ "values": { "AUTH_KEY": "v" }, "captured_at": now });
    SnapshotRepo::insert(&pool, "secret_snapshot_0000000001_000001", &payload, now)
        .await
        .expect("insert snapshot");

    let t = quiet_engine(RunOutcome::success(TOOL_SUCCESS));
    let app = build_test_app(pool, &t);

    let response = get(app, "/api/v1/rotation/status").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["disabled"], false);
    assert_eq!(data["overdue"], false, "a two-hour-old success is fresh");
    assert!(data["last_success_at"].is_string());
    assert_eq!(data["snapshot_count"], 1);

    let attempts = data["recent_attempts"].as_array().expect("attempts array");
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["status"], "failure", "newest first");
    assert_eq!(attempts[0]["error"], "timed out");
    assert_eq!(attempts[1]["status"], "success");
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn status_filters_attempts_by_trigger(pool: PgPool) {
    let now = Utc::now();
    let scheduled = audit_row(
        RotationOutcome::Success,
        TriggerSource::Scheduled,
        now - Duration::hours(2),
    );
    AttemptRepo::insert(&pool, &scheduled).await.expect("insert scheduled");
    let manual = audit_row(
        RotationOutcome::Success,
        TriggerSource::Manual,
        now - Duration::hours(1),
    );
    AttemptRepo::insert(&pool, &manual).await.expect("insert manual");

    let t = quiet_engine(RunOutcome::success(TOOL_SUCCESS));
    let app = build_test_app(pool, &t);

    let response = get(app, "/api/v1/rotation/status?trigger=manual").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let attempts = json["data"]["recent_attempts"].as_array().expect("attempts array");
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["trigger_source"], "manual");
}
