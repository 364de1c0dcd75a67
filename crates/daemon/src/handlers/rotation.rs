//! Handlers for rotation control endpoints.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use keywheel_core::attempt::TriggerSource;
use keywheel_core::schedule;
use keywheel_core::types::Timestamp;
use keywheel_db::models::attempt::RotationAttempt;
use keywheel_db::repositories::attempt_repo::AttemptRepo;
use keywheel_db::repositories::snapshot_repo::SnapshotRepo;
use serde::{Deserialize, Serialize};

use crate::engine::{AttemptSummary, RotationRun};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Outcome of a manual rotation trigger.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    /// `disabled`, `busy`, or `completed`.
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<AttemptView>,
}

/// Serialized view of one completed attempt.
#[derive(Debug, Serialize)]
pub struct AttemptView {
    pub outcome: &'static str,
    pub trigger_source: &'static str,
    pub snapshot_key: Option<String>,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_secs: f64,
}

impl From<AttemptSummary> for AttemptView {
    fn from(summary: AttemptSummary) -> Self {
        Self {
            outcome: summary.outcome.as_str(),
            trigger_source: summary.trigger.as_str(),
            snapshot_key: summary.snapshot_key,
            output: summary.output,
            error: (!summary.error.is_empty()).then_some(summary.error),
            duration_secs: summary.duration_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Manual trigger
// ---------------------------------------------------------------------------

/// POST /rotation/run
///
/// Trigger a rotation now. An active kill switch or a concurrent in-flight
/// rotation is reported in the payload, not as an HTTP error.
pub async fn run_rotation(State(state): State<AppState>) -> Json<DataResponse<RunResponse>> {
    let run = state.engine.execute(TriggerSource::Manual).await;

    let response = match run {
        RotationRun::Disabled => RunResponse {
            result: "disabled",
            attempt: None,
        },
        RotationRun::Busy => RunResponse {
            result: "busy",
            attempt: None,
        },
        RotationRun::Completed(summary) => RunResponse {
            result: "completed",
            attempt: Some(summary.into()),
        },
    };

    Json(DataResponse { data: response })
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Default number of recent attempts in the status payload.
const DEFAULT_ATTEMPT_LIMIT: i64 = 10;

/// Upper bound on the `limit` query parameter.
const MAX_ATTEMPT_LIMIT: i64 = 100;

/// Query parameters for the status endpoint.
#[derive(Debug, Deserialize)]
pub struct StatusParams {
    /// How many recent attempts to include (default 10, max 100).
    pub limit: Option<i64>,
    /// Only include attempts with this trigger source.
    pub trigger: Option<String>,
}

/// Rotation service status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Kill switch state.
    pub disabled: bool,
    pub last_success_at: Option<Timestamp>,
    /// Whether the last success is older than the staleness window.
    pub overdue: bool,
    pub snapshot_count: i64,
    pub recent_attempts: Vec<RotationAttempt>,
}

/// GET /rotation/status?limit=N&trigger=manual
///
/// Read-only view over the audit log and snapshot store; never touches the
/// engine.
pub async fn rotation_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_ATTEMPT_LIMIT);
    if !(1..=MAX_ATTEMPT_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_ATTEMPT_LIMIT}"
        )));
    }

    let trigger = params
        .trigger
        .as_deref()
        .map(TriggerSource::from_str)
        .transpose()?;

    let last_success_at = AttemptRepo::last_success_at(&state.pool).await?;
    let snapshot_count = SnapshotRepo::count(&state.pool).await?;
    let recent_attempts = match trigger {
        Some(trigger) => AttemptRepo::recent_by_trigger(&state.pool, trigger, limit).await?,
        None => AttemptRepo::recent(&state.pool, limit).await?,
    };

    Ok(Json(DataResponse {
        data: StatusResponse {
            disabled: state.rotation.disabled,
            last_success_at,
            overdue: schedule::is_overdue(last_success_at, Utc::now()),
            snapshot_count,
            recent_attempts,
        },
    }))
}
