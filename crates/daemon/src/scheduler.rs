//! Daily rotation schedule.
//!
//! One background task per process computes the next fixed local fire time,
//! sleeps until it, and triggers a scheduled rotation. Registration is
//! idempotent: a second `ensure_started` call is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use keywheel_core::attempt::TriggerSource;
use keywheel_core::schedule::next_daily_fire;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::RotationEngine;

/// Owns the "already scheduled" marker and spawns the daily loop.
pub struct RotationScheduler {
    engine: Arc<RotationEngine>,
    hour: u32,
    minute: u32,
    started: AtomicBool,
}

impl RotationScheduler {
    pub fn new(engine: Arc<RotationEngine>, hour: u32, minute: u32) -> Self {
        Self {
            engine,
            hour,
            minute,
            started: AtomicBool::new(false),
        }
    }

    /// Start the daily loop, once.
    ///
    /// Returns `None` when this scheduler was already started; the running
    /// loop is left untouched. The loop runs until `cancel` is triggered.
    pub fn ensure_started(&self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Rotation schedule already registered");
            return None;
        }

        let engine = Arc::clone(&self.engine);
        let (hour, minute) = (self.hour, self.minute);
        Some(tokio::spawn(async move {
            run_loop(engine, hour, minute, cancel).await;
        }))
    }
}

async fn run_loop(engine: Arc<RotationEngine>, hour: u32, minute: u32, cancel: CancellationToken) {
    tracing::info!(hour, minute, "Rotation schedule started");

    loop {
        let now = Local::now();
        let fire_at = next_daily_fire(&now, hour, minute);
        // next_daily_fire is strictly after `now`, so this never underflows.
        let wait = (fire_at - now).to_std().unwrap_or_default();
        tracing::debug!(fire_at = %fire_at, "Sleeping until next scheduled rotation");

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Rotation schedule stopping");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                engine.execute(TriggerSource::Scheduled).await;
            }
        }
    }
}
