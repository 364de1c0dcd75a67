pub mod health;
pub mod rotation;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /rotation/run      trigger a rotation now (POST)
/// /rotation/status   engine, audit, and snapshot status (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/rotation", rotation::router())
}
