// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use std::time::Duration;

use clap::Parser;

/// Observation-and-reconciliation server for AI coding-agent terminal
/// sessions.
#[derive(Debug, Clone, Parser)]
#[command(name = "paneboard", version, about)]
pub struct Config {
    /// HTTP/WebSocket port to listen on.
    #[arg(long, env = "PANEBOARD_PORT", default_value = "4900")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "PANEBOARD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Bearer/query token required on every request when set.
    #[arg(long, env = "PANEBOARD_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Path to the SQLite database file.
    #[arg(long, env = "PANEBOARD_DB_PATH", default_value = "paneboard.sqlite3")]
    pub db_path: String,

    /// Log format (json or text).
    #[arg(long, env = "PANEBOARD_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "PANEBOARD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Lines of terminal content captured per poll.
    #[arg(long, env = "CAPTURE_LINES", default_value = "150")]
    pub capture_lines: usize,

    /// Multiplexer poll interval in milliseconds.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Hook precedence window in milliseconds.
    #[arg(long, env = "HOOK_PRECEDENCE_MS", default_value = "2000")]
    pub hook_precedence_ms: u64,

    /// Minimum hold interval before a same-or-lower priority terminal
    /// verdict may override status, in milliseconds.
    #[arg(long, env = "MIN_HOLD_MS", default_value = "1000")]
    pub min_hold_ms: u64,

    /// Reconciler coalescing window in milliseconds.
    #[arg(long, env = "COALESCE_MS", default_value = "50")]
    pub coalesce_ms: u64,

    /// Idle grace period before a missing session is destroyed, in
    /// milliseconds.
    #[arg(long, env = "IDLE_GRACE_MS", default_value = "300000")]
    pub idle_grace_ms: u64,

    /// Event retention window in days.
    #[arg(long, env = "RETENTION_DAYS", default_value = "7")]
    pub retention_days: u64,

    /// Maximum panes allowed per group.
    #[arg(long, env = "MAX_PANES_PER_GROUP", default_value = "4")]
    pub max_panes_per_group: usize,

    /// Per-client buffered-bytes threshold above which broadcasting pauses
    /// NORMAL/LOW priority delivery.
    #[arg(long, env = "PAUSE_HIGH_BYTES", default_value = "65536")]
    pub pause_high_bytes: usize,

    /// Per-client buffered-bytes threshold below which delivery resumes.
    #[arg(long, env = "RESUME_LOW_BYTES", default_value = "16384")]
    pub resume_low_bytes: usize,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.resume_low_bytes >= self.pause_high_bytes {
            anyhow::bail!("RESUME_LOW_BYTES must be less than PAUSE_HIGH_BYTES");
        }
        if self.max_panes_per_group == 0 {
            anyhow::bail!("MAX_PANES_PER_GROUP must be at least 1");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn hook_precedence(&self) -> Duration {
        Duration::from_millis(self.hook_precedence_ms)
    }

    pub fn min_hold(&self) -> Duration {
        Duration::from_millis(self.min_hold_ms)
    }

    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_ms)
    }

    pub fn idle_grace(&self) -> Duration {
        Duration::from_millis(self.idle_grace_ms)
    }

    pub fn retention_window(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
