// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use std::time::SystemTime;

use paneboard_core::session::{SessionRegistry, StatusSource};
use paneboard_core::state_machine::SessionStatus;

use super::*;

fn terminal(id: &str, group_id: &str, process: ProcessClass) -> Terminal {
    Terminal {
        id: id.to_owned(),
        group_id: group_id.to_owned(),
        index: 0,
        active: true,
        width: 80,
        height: 24,
        process,
        working_dir: None,
        pid: None,
    }
}

#[tokio::test]
async fn multiplexer_snapshot_emits_windows_then_pane_update_for_assistants() {
    let registry = Arc::new(SessionRegistry::new());
    registry.create_if_absent("t1", SystemTime::now()).await;
    let fabric = BroadcastFabric::new();
    let client = fabric.register("c1".to_owned()).await;
    let mut rx = client.take_receiver().await.unwrap();
    let mut known = HashSet::new();

    let terminals = vec![terminal("t1", "g1", ProcessClass::Assistant), terminal("t2", "g1", ProcessClass::Shell)];
    handle(&registry, &fabric, &mut known, BusEvent::MultiplexerSnapshot { groups: vec!["g1".to_owned()], terminals }).await;

    let windows = rx.recv().await.unwrap();
    assert!(windows.payload.contains("\"type\":\"windows\""));
    assert!(windows.payload.contains("\"g1\""));

    let pane_update = rx.recv().await.unwrap();
    assert!(pane_update.payload.contains("\"type\":\"pane_update\""));
    assert!(pane_update.payload.contains("\"t1\""));
    assert!(rx.try_recv().is_err(), "the shell terminal must not produce a pane_update");
}

#[tokio::test]
async fn multiplexer_snapshot_diff_emits_pane_removed_on_next_tick() {
    let registry = Arc::new(SessionRegistry::new());
    let fabric = BroadcastFabric::new();
    let client = fabric.register("c1".to_owned()).await;
    let mut rx = client.take_receiver().await.unwrap();
    let mut known = HashSet::new();

    handle(&registry, &fabric, &mut known, BusEvent::MultiplexerSnapshot { groups: vec!["g1".to_owned()], terminals: vec![terminal("t1", "g1", ProcessClass::Shell)] }).await;
    let _windows = rx.recv().await.unwrap();

    handle(&registry, &fabric, &mut known, BusEvent::MultiplexerSnapshot { groups: vec![], terminals: vec![] }).await;
    let _windows2 = rx.recv().await.unwrap();
    let removed = rx.recv().await.unwrap();
    assert!(removed.payload.contains("\"type\":\"pane_removed\""));
    assert!(removed.payload.contains("\"t1\""));
}

#[tokio::test]
async fn session_status_changed_emits_pane_update_with_new_status() {
    let registry = Arc::new(SessionRegistry::new());
    registry.create_if_absent("t1", SystemTime::now()).await;
    registry.try_set_status("t1", SessionStatus::Working, StatusSource::Hook, SystemTime::now()).await.unwrap();
    let fabric = BroadcastFabric::new();
    let client = fabric.register("c1".to_owned()).await;
    let mut rx = client.take_receiver().await.unwrap();
    let mut known = HashSet::new();

    handle(
        &registry,
        &fabric,
        &mut known,
        BusEvent::SessionStatusChanged { terminal_id: "t1".to_owned(), persona_id: None, old_status: SessionStatus::Idle, new_status: SessionStatus::Working },
    )
    .await;

    let frame = rx.recv().await.unwrap();
    assert!(frame.payload.contains("\"type\":\"pane_update\""));
    assert!(frame.payload.contains("\"working\""));
}

#[tokio::test]
async fn terminal_captured_emits_terminal_output() {
    let registry = Arc::new(SessionRegistry::new());
    let fabric = BroadcastFabric::new();
    let client = fabric.register("c1".to_owned()).await;
    let mut rx = client.take_receiver().await.unwrap();
    let mut known = HashSet::new();

    handle(&registry, &fabric, &mut known, BusEvent::TerminalCaptured { terminal_id: "t1".to_owned(), buffer: "hello".to_owned() }).await;

    let frame = rx.recv().await.unwrap();
    assert!(frame.payload.contains("\"type\":\"terminal_output\""));
    assert!(frame.payload.contains("hello"));
}

#[tokio::test]
async fn assistant_hook_emits_low_priority_event() {
    let registry = Arc::new(SessionRegistry::new());
    let fabric = BroadcastFabric::new();
    let client = fabric.register("c1".to_owned()).await;
    let mut rx = client.take_receiver().await.unwrap();
    let mut known = HashSet::new();

    handle(
        &registry,
        &fabric,
        &mut known,
        BusEvent::AssistantHook { terminal_id: "t1".to_owned(), kind: paneboard_core::bus::HookKind::Stop, payload: serde_json::json!({}) },
    )
    .await;

    let frame = rx.recv().await.unwrap();
    assert!(frame.payload.contains("\"type\":\"event\""));
    assert!(frame.payload.contains("\"stop\""));
}
