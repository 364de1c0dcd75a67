use std::sync::Arc;

use crate::config::{RotationConfig, ServerConfig};
use crate::engine::RotationEngine;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: keywheel_db::DbPool,
    /// HTTP server configuration.
    pub config: Arc<ServerConfig>,
    /// Rotation behavior configuration (kill switch, retention, schedule).
    pub rotation: Arc<RotationConfig>,
    /// The rotation engine, shared with the scheduler and middleware.
    pub engine: Arc<RotationEngine>,
}
