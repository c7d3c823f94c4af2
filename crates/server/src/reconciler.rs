// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! The central brain (C7): consumes multiplexer snapshots, assistant
//! hooks, and captured terminal buffers; calls the status state machine
//! and writes to the session registry; emits `session:status_changed`.
//!
//! Per the persona/challenge dependency-injection pattern this workspace
//! otherwise avoids needing, the reconciler is constructed with an
//! `Arc<dyn StatusSink>` rather than talking to the broadcast fabric
//! directly — it never needs to know that clients exist.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use paneboard_core::bus::{BusEvent, EventBus, HookKind};
use paneboard_core::parser::{self, ParserOptions, TerminalStatus};
use paneboard_core::pattern::PatternRegistry;
use paneboard_core::session::{LastError, SessionRegistry, StatusSource};
use paneboard_core::state_machine::SessionStatus;
use paneboard_core::terminal::ProcessClass;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::linking::Linker;

const ACCEPTANCE_THRESHOLD: f32 = 0.7;

/// Narrow emission seam so the reconciler never depends on the broadcast
/// fabric's types.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn emit(&self, event: BusEvent);
}

/// The default sink: publishes straight back onto the event bus, where
/// both persistence and the broadcast fabric subscribe.
pub struct EventBusSink(pub EventBus);

#[async_trait]
impl StatusSink for EventBusSink {
    async fn emit(&self, event: BusEvent) {
        self.0.publish(event).await;
    }
}

struct PendingEmission {
    old_status: SessionStatus,
    new_status: SessionStatus,
    persona_id: Option<String>,
    deadline: tokio::time::Instant,
}

pub struct ReconcilerConfig {
    pub hook_precedence: Duration,
    pub min_hold: Duration,
    pub coalesce_window: Duration,
    pub idle_grace: Duration,
    pub parser_options: ParserOptions,
}

/// C7. Owns no session state itself — all session data lives in the
/// shared [`SessionRegistry`]; this struct only holds bookkeeping needed
/// to implement the coalescing window.
pub struct Reconciler {
    registry: Arc<SessionRegistry>,
    patterns: Arc<PatternRegistry>,
    sink: Arc<dyn StatusSink>,
    linker: Arc<Linker>,
    config: ReconcilerConfig,
    pending: Mutex<HashMap<String, PendingEmission>>,
}

impl Reconciler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        patterns: Arc<PatternRegistry>,
        sink: Arc<dyn StatusSink>,
        linker: Arc<Linker>,
        config: ReconcilerConfig,
    ) -> Self {
        Self { registry, patterns, sink, linker, config, pending: Mutex::new(HashMap::new()) }
    }

    /// Run the reconciler's event loop until `cancel` fires.
    pub async fn run(self: Arc<Self>, bus: EventBus, cancel: CancellationToken) {
        let mut subscription = bus.subscribe().await;
        let flush_period = (self.config.coalesce_window / 2).max(Duration::from_millis(5));
        let mut flush_tick = tokio::time::interval(flush_period);
        flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = flush_tick.tick() => {
                    self.flush_expired().await;
                }
                event = subscription.recv() => {
                    self.handle_event(event).await;
                }
            }
        }
    }

    async fn handle_event(&self, event: BusEvent) {
        let now = SystemTime::now();
        match event {
            BusEvent::MultiplexerSnapshot { terminals, .. } => self.handle_snapshot(&terminals, now).await,
            BusEvent::AssistantHook { terminal_id, kind, payload } => {
                self.handle_hook(&terminal_id, kind, &payload, now).await;
            }
            BusEvent::TerminalCaptured { terminal_id, buffer } => {
                self.handle_captured(&terminal_id, &buffer, now).await;
            }
            _ => {}
        }
    }

    /// Rule 1: existence.
    async fn handle_snapshot(&self, terminals: &[paneboard_core::terminal::Terminal], now: SystemTime) {
        let mut present = std::collections::HashSet::new();
        for terminal in terminals {
            if terminal.process != ProcessClass::Assistant {
                continue;
            }
            present.insert(terminal.id.clone());
            if self.registry.create_if_absent(&terminal.id, now).await {
                debug!(terminal_id = %terminal.id, "session created on first sighting");
                if let Some(working_dir) = &terminal.working_dir {
                    if let Err(e) = self.linker.link_project(&terminal.id, working_dir).await {
                        warn!(terminal_id = %terminal.id, %e, "project link failed");
                    }
                }
            }
            self.registry.mark_present(&terminal.id).await;
        }

        for session in self.registry.all().await {
            if present.contains(&session.terminal_id) {
                continue;
            }
            let expired = self
                .registry
                .mark_missing_and_check_expiry(&session.terminal_id, now, self.config.idle_grace)
                .await;
            if expired {
                self.registry.remove(&session.terminal_id).await;
                debug!(terminal_id = %session.terminal_id, "session dropped, missing + idle-expired");
            }
        }
    }

    /// Rules 2 and 4: hook precedence and error clearing.
    async fn handle_hook(&self, terminal_id: &str, kind: HookKind, payload: &serde_json::Value, now: SystemTime) {
        if self.registry.get(terminal_id).await.is_none() {
            self.registry.create_if_absent(terminal_id, now).await;
        }

        match kind {
            HookKind::PostToolUse => {
                let failed = payload.get("failure").and_then(|v| v.as_bool()).unwrap_or(false);
                if failed {
                    let tool = payload
                        .get("tool")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown")
                        .to_owned();
                    let message = payload.get("message").and_then(|v| v.as_str()).map(str::to_owned);
                    self.registry
                        .set_error(terminal_id, LastError { tool: tool.clone(), message: message.clone(), timestamp: now })
                        .await;
                    self.sink.emit(BusEvent::SessionErrorSet {
                        terminal_id: terminal_id.to_owned(),
                        tool,
                        message,
                    })
                    .await;
                    self.apply_and_emit(terminal_id, SessionStatus::Error, StatusSource::Hook, now).await;
                } else {
                    self.registry.clear_error(terminal_id).await;
                    self.sink.emit(BusEvent::SessionErrorCleared { terminal_id: terminal_id.to_owned() }).await;
                    self.apply_and_emit(terminal_id, SessionStatus::Working, StatusSource::Hook, now).await;
                }
            }
            HookKind::Stop => {
                self.registry.clear_error(terminal_id).await;
                self.sink.emit(BusEvent::SessionErrorCleared { terminal_id: terminal_id.to_owned() }).await;
                self.apply_and_emit(terminal_id, SessionStatus::Idle, StatusSource::Hook, now).await;
            }
            HookKind::Error => {
                let tool = payload.get("tool").and_then(|v| v.as_str()).unwrap_or("unknown").to_owned();
                let message = payload.get("message").and_then(|v| v.as_str()).map(str::to_owned);
                self.registry
                    .set_error(terminal_id, LastError { tool: tool.clone(), message: message.clone(), timestamp: now })
                    .await;
                self.sink.emit(BusEvent::SessionErrorSet { terminal_id: terminal_id.to_owned(), tool, message }).await;
                self.apply_and_emit(terminal_id, SessionStatus::Error, StatusSource::Hook, now).await;
            }
            HookKind::PreToolUse | HookKind::UserPrompt | HookKind::SubagentStart | HookKind::SubagentStop => {
                self.apply_and_emit(terminal_id, SessionStatus::Working, StatusSource::Hook, now).await;
            }
        }
    }

    /// Rule 3: terminal verdict acceptance.
    async fn handle_captured(&self, terminal_id: &str, buffer: &str, now: SystemTime) {
        let verdict = parser::parse(&self.patterns, buffer, self.config.parser_options);

        let Some(record) = self.registry.get(terminal_id).await else {
            return;
        };

        self.registry
            .update_terminal_snapshot(terminal_id, buffer.to_owned(), verdict.confidence, verdict.prompt.clone())
            .await;

        let within_precedence_window = record
            .last_hook_update_at
            .and_then(|t| now.duration_since(t).ok())
            .map(|elapsed| elapsed <= self.config.hook_precedence)
            .unwrap_or(false);
        if within_precedence_window {
            return;
        }

        let proposed = match verdict.status {
            TerminalStatus::Idle => SessionStatus::Idle,
            TerminalStatus::Working => SessionStatus::Working,
            TerminalStatus::Waiting => SessionStatus::Waiting,
            TerminalStatus::Error => SessionStatus::Error,
            TerminalStatus::Unknown => return,
        };
        if !record.status.can_transition(proposed) {
            return;
        }
        if verdict.confidence < ACCEPTANCE_THRESHOLD {
            return;
        }
        let higher_priority = proposed.priority() > record.status.priority();
        let held_long_enough = now
            .duration_since(record.status_changed_at)
            .map(|elapsed| elapsed >= self.config.min_hold)
            .unwrap_or(false);
        if !higher_priority && !held_long_enough {
            return;
        }

        self.apply_and_emit(terminal_id, proposed, StatusSource::Terminal, now).await;
    }

    /// Apply a status change to the registry and either emit it
    /// immediately (waiting/error — never coalesced) or fold it into the
    /// pending coalesced emission for this terminal.
    async fn apply_and_emit(&self, terminal_id: &str, to: SessionStatus, source: StatusSource, now: SystemTime) {
        let change = match self.registry.try_set_status(terminal_id, to, source, now).await {
            Ok(Some(change)) => change,
            Ok(None) => return,
            Err(e) => {
                warn!(terminal_id = %terminal_id, %e, "reconciler rejected illegal transition");
                return;
            }
        };

        if matches!(to, SessionStatus::Waiting | SessionStatus::Error) {
            self.flush_one(terminal_id).await;
            self.sink.emit(BusEvent::from(change)).await;
            return;
        }

        let mut pending = self.pending.lock().await;
        match pending.get_mut(terminal_id) {
            Some(existing) => existing.new_status = change.new_status,
            None => {
                pending.insert(
                    terminal_id.to_owned(),
                    PendingEmission {
                        old_status: change.old_status,
                        new_status: change.new_status,
                        persona_id: change.persona_id,
                        deadline: tokio::time::Instant::now() + self.config.coalesce_window,
                    },
                );
            }
        }
    }

    /// `dismiss_waiting` (§4.9): suppress the waiting indicator locally,
    /// only permitted if the session is currently `waiting`. No side
    /// effect on the assistant itself.
    pub async fn dismiss_waiting(&self, terminal_id: &str) -> Result<bool, String> {
        let Some(record) = self.registry.get(terminal_id).await else {
            return Err(format!("unknown terminal {terminal_id}"));
        };
        if record.status != SessionStatus::Waiting {
            return Err("session is not waiting".to_owned());
        }
        let now = SystemTime::now();
        self.apply_and_emit(terminal_id, SessionStatus::Idle, StatusSource::Reconciler, now).await;
        Ok(true)
    }

    async fn flush_one(&self, terminal_id: &str) {
        let pending = self.pending.lock().await.remove(terminal_id);
        if let Some(p) = pending {
            if p.old_status != p.new_status {
                self.sink
                    .emit(BusEvent::SessionStatusChanged {
                        terminal_id: terminal_id.to_owned(),
                        persona_id: p.persona_id,
                        old_status: p.old_status,
                        new_status: p.new_status,
                    })
                    .await;
            }
        }
    }

    async fn flush_expired(&self) {
        let now = tokio::time::Instant::now();
        let expired: Vec<String> = {
            let pending = self.pending.lock().await;
            pending.iter().filter(|(_, p)| p.deadline <= now).map(|(k, _)| k.clone()).collect()
        };
        for terminal_id in expired {
            self.flush_one(&terminal_id).await;
        }
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
