// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Per-terminal session records: the single source of truth consulted by
//! every outgoing `pane_update`.
//!
//! Ownership: the registry owns every [`SessionRecord`]. Status may only be
//! changed through [`SessionRegistry::try_set_status`] so that the legality
//! check and the timestamp update happen atomically — callers outside the
//! reconciler must never write `status` directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::parser::TerminalPrompt;
use crate::state_machine::{transition, IllegalTransition, SessionStatus};

/// Which subsystem most recently set a session's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    Hook,
    Terminal,
    Reconciler,
}

/// The last tool error observed for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastError {
    pub tool: String,
    pub message: Option<String>,
    pub timestamp: SystemTime,
}

/// A single terminal-owning session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub terminal_id: String,
    pub persona_id: Option<String>,
    pub project_id: Option<String>,
    pub status: SessionStatus,
    pub status_source: StatusSource,
    pub status_changed_at: SystemTime,
    pub last_activity_at: SystemTime,
    pub last_hook_update_at: Option<SystemTime>,
    pub terminal_content: Option<String>,
    pub terminal_confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<LastError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_prompt: Option<TerminalPrompt>,
    /// Consecutive poller snapshots in which this session's terminal was
    /// absent. Reset to 0 whenever the terminal is seen.
    pub missing_snapshot_count: u32,
}

impl SessionRecord {
    fn new(terminal_id: &str, now: SystemTime) -> Self {
        Self {
            id: terminal_id.to_owned(),
            terminal_id: terminal_id.to_owned(),
            persona_id: None,
            project_id: None,
            status: SessionStatus::Idle,
            status_source: StatusSource::Reconciler,
            status_changed_at: now,
            last_activity_at: now,
            last_hook_update_at: None,
            terminal_content: None,
            terminal_confidence: None,
            last_error: None,
            terminal_prompt: None,
            missing_snapshot_count: 0,
        }
    }

    /// Whether this session currently needs attention, per the
    /// authoritative definition: `status ∈ {waiting, error}` OR a
    /// terminal prompt is present.
    pub fn needs_attention(&self) -> bool {
        matches!(self.status, SessionStatus::Waiting | SessionStatus::Error)
            || self.terminal_prompt.is_some()
    }
}

/// The result of an accepted status change, used to build the
/// `session:status_changed` event.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub terminal_id: String,
    pub persona_id: Option<String>,
    pub old_status: SessionStatus,
    pub new_status: SessionStatus,
}

/// In-memory map from terminal id to session record.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<RwLock<SessionRecord>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self { sessions: RwLock::new(HashMap::new()) }
    }

    /// Create a session for `terminal_id` if one doesn't already exist.
    /// Returns `true` if a new record was created.
    pub async fn create_if_absent(&self, terminal_id: &str, now: SystemTime) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(terminal_id) {
            return false;
        }
        sessions.insert(terminal_id.to_owned(), Arc::new(RwLock::new(SessionRecord::new(terminal_id, now))));
        true
    }

    /// Fetch a clone of the current session record, if any.
    pub async fn get(&self, terminal_id: &str) -> Option<SessionRecord> {
        let sessions = self.sessions.read().await;
        match sessions.get(terminal_id) {
            Some(lock) => Some(lock.read().await.clone()),
            None => None,
        }
    }

    /// Snapshot of every session currently tracked.
    pub async fn all(&self) -> Vec<SessionRecord> {
        let sessions = self.sessions.read().await;
        let mut out = Vec::with_capacity(sessions.len());
        for lock in sessions.values() {
            out.push(lock.read().await.clone());
        }
        out
    }

    /// Number of tracked sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove a session entirely (used once the destruction grace period
    /// in [`SessionRegistry::sweep_missing`] elapses).
    pub async fn remove(&self, terminal_id: &str) -> bool {
        self.sessions.write().await.remove(terminal_id).is_some()
    }

    /// Mark activity on a session, bumping `last_activity_at`.
    pub async fn touch_activity(&self, terminal_id: &str, now: SystemTime) {
        if let Some(lock) = self.sessions.read().await.get(terminal_id) {
            let mut record = lock.write().await;
            record.last_activity_at = record.last_activity_at.max(now);
        }
    }

    /// Record a tool error on a session.
    pub async fn set_error(&self, terminal_id: &str, error: LastError) {
        if let Some(lock) = self.sessions.read().await.get(terminal_id) {
            lock.write().await.last_error = Some(error);
        }
    }

    /// Clear a session's last error.
    pub async fn clear_error(&self, terminal_id: &str) {
        if let Some(lock) = self.sessions.read().await.get(terminal_id) {
            lock.write().await.last_error = None;
        }
    }

    /// Update the cached terminal content/confidence/prompt without
    /// touching `status` (used when a hook precedence window suppresses a
    /// terminal verdict's status but the raw content should still refresh).
    pub async fn update_terminal_snapshot(
        &self,
        terminal_id: &str,
        content: String,
        confidence: f32,
        prompt: Option<TerminalPrompt>,
    ) {
        if let Some(lock) = self.sessions.read().await.get(terminal_id) {
            let mut record = lock.write().await;
            record.terminal_content = Some(content);
            record.terminal_confidence = Some(confidence);
            record.terminal_prompt = prompt;
        }
    }

    /// Link a session to a persona/project once resolved.
    pub async fn set_links(&self, terminal_id: &str, persona_id: Option<String>, project_id: Option<String>) {
        if let Some(lock) = self.sessions.read().await.get(terminal_id) {
            let mut record = lock.write().await;
            if persona_id.is_some() {
                record.persona_id = persona_id;
            }
            if project_id.is_some() {
                record.project_id = project_id;
            }
        }
    }

    /// Atomically attempt a status change. Only the reconciler should call
    /// this — it is the sole writer permitted to mutate `status` per the
    /// registry's ownership contract.
    ///
    /// Invariant maintained: `status_changed_at <= last_activity_at`.
    pub async fn try_set_status(
        &self,
        terminal_id: &str,
        to: SessionStatus,
        source: StatusSource,
        now: SystemTime,
    ) -> Result<Option<StatusChange>, IllegalTransition> {
        let Some(lock) = self.sessions.read().await.get(terminal_id).cloned() else {
            return Ok(None);
        };
        let mut record = lock.write().await;
        let from = record.status;
        let new_status = transition(from, to)?;
        record.last_activity_at = record.last_activity_at.max(now);
        if matches!(source, StatusSource::Hook) {
            // A hook event extends the precedence window even when it
            // re-confirms the current status (e.g. a second `PreToolUse`
            // while already `working`) — the window is about the hook
            // having spoken most recently, not about status having moved.
            record.last_hook_update_at = Some(now);
        }
        if from == new_status {
            // No-op transition: source may still update but nothing is
            // emitted.
            record.status_source = source;
            return Ok(None);
        }
        record.status = new_status;
        record.status_source = source;
        record.status_changed_at = now;
        Ok(Some(StatusChange {
            terminal_id: terminal_id.to_owned(),
            persona_id: record.persona_id.clone(),
            old_status: from,
            new_status,
        }))
    }

    /// Mark `now`'s snapshot as missing this terminal. Returns `true` once
    /// the session has been missing for two consecutive snapshots AND has
    /// been idle for at least `idle_grace`.
    pub async fn mark_missing_and_check_expiry(
        &self,
        terminal_id: &str,
        now: SystemTime,
        idle_grace: Duration,
    ) -> bool {
        let Some(lock) = self.sessions.read().await.get(terminal_id).cloned() else {
            return false;
        };
        let mut record = lock.write().await;
        record.missing_snapshot_count = record.missing_snapshot_count.saturating_add(1);
        let idle_long_enough = now
            .duration_since(record.last_activity_at)
            .map(|elapsed| elapsed >= idle_grace)
            .unwrap_or(false);
        record.missing_snapshot_count >= 2 && idle_long_enough
    }

    /// Reset the missing-snapshot counter (terminal seen again).
    pub async fn mark_present(&self, terminal_id: &str) {
        if let Some(lock) = self.sessions.read().await.get(terminal_id) {
            lock.write().await.missing_snapshot_count = 0;
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
