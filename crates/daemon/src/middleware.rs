//! HTTP middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

/// Spawn a detached overdue check on every inbound request.
///
/// Any traffic at all will eventually recover a missed scheduled rotation;
/// the check never delays the request it rides on. When the last success is
/// fresh this costs one indexed query, and the engine's single-flight guard
/// keeps simultaneous requests from stacking rotations.
pub async fn overdue_watch(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let engine = Arc::clone(&state.engine);
    tokio::spawn(async move {
        engine.run_if_overdue().await;
    });

    next.run(request).await
}
