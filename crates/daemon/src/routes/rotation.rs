//! Route definitions for rotation control.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::rotation;
use crate::state::AppState;

/// Rotation routes mounted at `/rotation`.
///
/// ```text
/// POST /run     -> run_rotation (manual trigger)
/// GET  /status  -> rotation_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run", post(rotation::run_rotation))
        .route("/status", get(rotation::rotation_status))
}
