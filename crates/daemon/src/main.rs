use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keywheel_core::runner::ProcessRunner;
use keywheel_daemon::config::{RotationConfig, ServerConfig};
use keywheel_daemon::engine::{FailureAlerts, PgAuditSink, PgSnapshotStore, RotationEngine};
use keywheel_daemon::scheduler::RotationScheduler;
use keywheel_daemon::state::AppState;
use keywheel_daemon::{middleware, routes};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keywheel_daemon=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let rotation = Arc::new(RotationConfig::from_env());
    tracing::info!(
        host = %config.host,
        port = config.port,
        disabled = rotation.disabled,
        retention = rotation.retention,
        command = %rotation.command.display(),
        "Loaded configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = keywheel_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    keywheel_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    keywheel_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Rotation engine ---
    let engine = Arc::new(RotationEngine::new(
        Arc::clone(&rotation),
        Arc::new(PgSnapshotStore::new(pool.clone())),
        Arc::new(PgAuditSink::new(pool.clone())),
        Arc::new(FailureAlerts::from_env()),
        Arc::new(ProcessRunner::new(rotation.command_timeout)),
    ));

    // --- Scheduler ---
    let cancel = tokio_util::sync::CancellationToken::new();
    let scheduler = RotationScheduler::new(
        Arc::clone(&engine),
        rotation.rotation_hour,
        rotation.rotation_minute,
    );
    let scheduler_handle = scheduler.ensure_started(cancel.clone());

    // Startup overdue pass: catches a rotation missed while the daemon was
    // down, without waiting for traffic or the next scheduled fire.
    let startup_engine = Arc::clone(&engine);
    tokio::spawn(async move {
        startup_engine.run_if_overdue().await;
    });

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        rotation: Arc::clone(&rotation),
        engine,
    };

    // --- Router ---
    let app = Router::new()
        // Health check at root level (not under /api/v1).
        .merge(routes::health::router())
        // API v1 routes.
        .nest("/api/v1", routes::api_routes())
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500.
        .layer(CatchPanicLayer::new())
        // Request timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Overdue self-healing check on every inbound request.
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::overdue_watch,
        ))
        // Shared state.
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    if let Some(handle) = scheduler_handle {
        let timeout = Duration::from_secs(config.shutdown_timeout_secs);
        let _ = tokio::time::timeout(timeout, handle).await;
    }
    tracing::info!("Rotation schedule stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager
/// (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
