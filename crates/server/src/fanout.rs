// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Bridges the event bus to the broadcast fabric (§6.1): turns the core's
//! domain events into wire `ServerMessage`s and hands them to
//! [`BroadcastFabric::broadcast`] at the right priority.
//!
//! `multiplexer:snapshot` carries the full `groups[]/terminals[]` state
//! every tick; the wire protocol wants incremental `pane_update` and
//! `pane_removed` messages instead. This subscriber keeps the one piece
//! of state needed to diff consecutive snapshots into removals — no other
//! module needs to know which panes were present last tick.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use paneboard_core::bus::{BusEvent, EventBus, HookKind};
use paneboard_core::session::SessionRegistry;
use paneboard_core::terminal::{ProcessClass, Terminal};
use tokio_util::sync::CancellationToken;

use crate::broadcast::BroadcastFabric;
use crate::wire::{ActivityEvent, Group, ServerMessage, SessionInfo, TerminalOutputPayload};

pub fn spawn(
    bus: EventBus,
    registry: Arc<SessionRegistry>,
    fabric: BroadcastFabric,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let subscription = bus.subscribe().await;
        let mut known_panes: HashSet<String> = HashSet::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = subscription.recv() => {
                    handle(&registry, &fabric, &mut known_panes, event).await;
                }
            }
        }
    })
}

async fn handle(registry: &SessionRegistry, fabric: &BroadcastFabric, known_panes: &mut HashSet<String>, event: BusEvent) {
    match event {
        BusEvent::MultiplexerSnapshot { groups, terminals } => {
            send(fabric, &ServerMessage::Windows { payload: build_groups(&groups, &terminals) }).await;

            let mut seen = HashSet::with_capacity(terminals.len());
            for terminal in &terminals {
                seen.insert(terminal.id.clone());
                if terminal.process != ProcessClass::Assistant {
                    continue;
                }
                if let Some(record) = registry.get(&terminal.id).await {
                    send(fabric, &ServerMessage::PaneUpdate { pane_id: terminal.id.clone(), session: SessionInfo::from(&record) }).await;
                }
            }
            for gone in known_panes.difference(&seen) {
                send(fabric, &ServerMessage::PaneRemoved { pane_id: gone.clone() }).await;
            }
            *known_panes = seen;
        }

        BusEvent::SessionStatusChanged { terminal_id, .. }
        | BusEvent::SessionErrorSet { terminal_id, .. }
        | BusEvent::SessionErrorCleared { terminal_id } => {
            if let Some(record) = registry.get(&terminal_id).await {
                send(fabric, &ServerMessage::PaneUpdate { pane_id: terminal_id, session: SessionInfo::from(&record) }).await;
            }
        }

        BusEvent::TerminalCaptured { terminal_id, buffer } => {
            let payload = TerminalOutputPayload { pane_id: terminal_id, target: "primary".to_owned(), content: buffer };
            send(fabric, &ServerMessage::TerminalOutput { payload }).await;
        }

        BusEvent::AssistantHook { terminal_id, kind, .. } => {
            let payload = ActivityEvent { event_type: hook_event_name(kind), pane_id: Some(terminal_id), timestamp: Utc::now().to_rfc3339() };
            send(fabric, &ServerMessage::Event { payload }).await;
        }

        // Connection lifecycle is broadcast (if at all) by the ws layer
        // itself, which already knows the client's own socket state.
        BusEvent::ClientConnected { .. } | BusEvent::ClientDisconnected { .. } => {}
    }
}

fn build_groups(groups: &[String], terminals: &[Terminal]) -> Vec<Group> {
    groups
        .iter()
        .enumerate()
        .map(|(index, group_id)| {
            let pane_ids = terminals.iter().filter(|t| &t.group_id == group_id).map(|t| t.id.clone()).collect();
            Group { id: group_id.clone(), name: group_id.clone(), index: index as u32, pane_ids }
        })
        .collect()
}

fn hook_event_name(kind: HookKind) -> String {
    match kind {
        HookKind::PreToolUse => "pre_tool_use",
        HookKind::PostToolUse => "post_tool_use",
        HookKind::Stop => "stop",
        HookKind::UserPrompt => "user_prompt",
        HookKind::SubagentStart => "subagent_start",
        HookKind::SubagentStop => "subagent_stop",
        HookKind::Error => "error",
    }
    .to_owned()
}

async fn send(fabric: &BroadcastFabric, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(json) => fabric.broadcast(message.priority(), &json).await,
        Err(e) => tracing::warn!(error = %e, "failed to serialize server message"),
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
