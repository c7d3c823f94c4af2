// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use std::sync::Arc;
use std::time::{Duration, Instant};

use paneboard_core::bus::EventBus;
use paneboard_core::parser::ParserOptions;
use paneboard_core::pattern::PatternRegistry;
use paneboard_core::session::SessionRegistry;
use clap::Parser;

use super::*;
use crate::adapter::MockAdapter;
use crate::broadcast::BroadcastFabric;
use crate::commands::CommandRouter;
use crate::config::Config;
use crate::db::Db;
use crate::linking::Linker;
use crate::reconciler::{EventBusSink, Reconciler, ReconcilerConfig};

async fn test_state() -> Arc<AppState> {
    let path = std::env::temp_dir().join(format!("paneboard-hooks-test-{}.db", uuid::Uuid::new_v4()));
    let db = Arc::new(Db::connect(path.to_string_lossy().as_ref()).await.unwrap());
    let registry = Arc::new(SessionRegistry::new());
    let patterns = Arc::new(PatternRegistry::new());
    let bus = EventBus::new();
    let sink: Arc<dyn crate::reconciler::StatusSink> = Arc::new(EventBusSink(bus.clone()));
    let reconciler_config = ReconcilerConfig {
        hook_precedence: Duration::from_millis(2000),
        min_hold: Duration::from_millis(1000),
        coalesce_window: Duration::from_millis(50),
        idle_grace: Duration::from_millis(300_000),
        parser_options: ParserOptions::default(),
    };
    let linker = Arc::new(Linker::new(db.clone(), registry.clone()));
    let reconciler = Arc::new(Reconciler::new(registry.clone(), patterns.clone(), sink, linker.clone(), reconciler_config));
    let adapter: Arc<dyn crate::adapter::MuxAdapter> = Arc::new(MockAdapter::new());
    let commands = Arc::new(CommandRouter::new(adapter.clone(), reconciler.clone(), bus.clone(), 150, 4));

    Arc::new(AppState {
        config: Arc::new(Config::parse_from(["paneboard"])),
        registry,
        patterns,
        bus,
        reconciler,
        fabric: BroadcastFabric::new(),
        db,
        linker,
        adapter,
        commands,
        started_at: Instant::now(),
    })
}

fn payload(event_id: &str, terminal_id: &str) -> HookPayload {
    HookPayload {
        event_id: event_id.to_owned(),
        terminal_id: terminal_id.to_owned(),
        kind: HookKind::PreToolUse,
        tool: None,
        payload: None,
        session_id: None,
    }
}

#[tokio::test]
async fn hook_publishes_event_and_persists_row() {
    let state = test_state().await;
    let subscription = state.bus.subscribe().await;

    let reply = hook(State(state.clone()), Json(payload("e1", "t1"))).await.0;
    assert!(reply.ok);
    assert_eq!(state.db.event_count().await.unwrap(), 1);

    let event = subscription.recv().await;
    assert!(matches!(event, BusEvent::AssistantHook { terminal_id, .. } if terminal_id == "t1"));
}

#[tokio::test]
async fn duplicate_event_id_is_discarded_and_not_republished() {
    let state = test_state().await;
    let subscription = state.bus.subscribe().await;

    hook(State(state.clone()), Json(payload("e1", "t1"))).await;
    let reply = hook(State(state.clone()), Json(payload("e1", "t1"))).await.0;
    assert!(reply.ok);
    assert_eq!(state.db.event_count().await.unwrap(), 1);

    // Only one AssistantHook should have been published.
    let first = subscription.recv().await;
    assert!(matches!(first, BusEvent::AssistantHook { .. }));
    let second = tokio::time::timeout(Duration::from_millis(50), subscription.recv()).await;
    assert!(second.is_err(), "no second event should arrive");
}

#[tokio::test]
async fn hook_with_session_id_links_persona_without_error() {
    let state = test_state().await;
    let mut payload = payload("e1", "t1");
    payload.session_id = Some("external-1".to_owned());

    let reply = hook(State(state.clone()), Json(payload)).await.0;
    assert!(reply.ok);
}
