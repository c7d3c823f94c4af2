// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Periodic retention sweep (§4.10): deletes `events` rows older than the
//! configured retention window. Idempotent and cancellation-safe — a
//! sweep cancelled mid-run simply leaves some expired rows for next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::db::Db;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Spawn the retention sweeper loop. `retention` is the window (e.g.
/// `Config::retention_window()`); rows older than `now - retention` are
/// deleted each tick.
pub fn spawn(
    db: Arc<Db>,
    retention: Duration,
    sweep_interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let cutoff = Utc::now() - retention;
            match db.sweep_expired_events(cutoff).await {
                Ok(deleted) if deleted > 0 => debug!(deleted, "retention sweep deleted expired events"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "retention sweep failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
