// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Persists reconciler-originated bus events (`session:status_changed`,
//! `session:error_set`, `session:error_cleared`) into the `events` table
//! under freshly generated ids — hook-originated events are persisted by
//! [`crate::hooks`] directly, keyed by the client-supplied `event_id`, so
//! this subscriber never touches `assistant:hook` to avoid double-writing
//! the same occurrence under two different ids.

use std::sync::Arc;

use chrono::Utc;
use paneboard_core::bus::{BusEvent, EventBus};
use paneboard_core::session::SessionRegistry;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::db::{Db, NewEvent};

/// Spawn the persistence subscriber loop.
pub fn spawn(db: Arc<Db>, registry: Arc<SessionRegistry>, bus: EventBus, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut subscription = bus.subscribe().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = subscription.recv() => {
                    handle(&db, &registry, event).await;
                }
            }
        }
    })
}

async fn handle(db: &Db, registry: &SessionRegistry, event: BusEvent) {
    let (terminal_id, event_type, payload) = match &event {
        BusEvent::SessionStatusChanged { terminal_id, old_status, new_status, .. } => (
            terminal_id.clone(),
            "session:status_changed",
            serde_json::json!({"old_status": old_status, "new_status": new_status}),
        ),
        BusEvent::SessionErrorSet { terminal_id, tool, message } => (
            terminal_id.clone(),
            "session:error_set",
            serde_json::json!({"tool": tool, "message": message}),
        ),
        BusEvent::SessionErrorCleared { terminal_id } => {
            (terminal_id.clone(), "session:error_cleared", serde_json::json!({}))
        }
        _ => return,
    };

    let record = registry.get(&terminal_id).await;
    let persona_id = record.as_ref().and_then(|r| r.persona_id.clone());
    let project_id = record.as_ref().and_then(|r| r.project_id.clone());
    let event_id = Uuid::new_v4().to_string();
    let payload_json = payload.to_string();

    let result = db
        .insert_reconciler_event(NewEvent {
            event_id: &event_id,
            terminal_id: &terminal_id,
            persona_id: persona_id.as_deref(),
            project_id: project_id.as_deref(),
            event_type,
            tool_name: None,
            payload: &payload_json,
            created_at: Utc::now(),
        })
        .await;

    if let Err(e) = result {
        warn!(error = %e, event_type, "failed to persist reconciler event");
    }
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;
