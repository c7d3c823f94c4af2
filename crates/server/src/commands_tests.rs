// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use std::time::SystemTime;

use paneboard_core::bus::EventBus;
use paneboard_core::parser::ParserOptions;
use paneboard_core::pattern::PatternRegistry;
use paneboard_core::session::{SessionRegistry, StatusSource};
use paneboard_core::state_machine::SessionStatus;
use paneboard_core::terminal::{ProcessClass, Terminal};

use super::*;
use crate::adapter::MockAdapter;
use crate::db::Db;
use crate::linking::Linker;
use crate::reconciler::{EventBusSink, Reconciler, ReconcilerConfig};
use crate::wire::SendTextFlags;

async fn test_db() -> Db {
    let path = std::env::temp_dir().join(format!("paneboard-commands-test-{}.db", uuid::Uuid::new_v4()));
    Db::connect(path.to_string_lossy().as_ref()).await.unwrap()
}

fn terminal(id: &str, group_id: &str) -> Terminal {
    Terminal {
        id: id.to_owned(),
        group_id: group_id.to_owned(),
        index: 0,
        active: true,
        width: 80,
        height: 24,
        process: ProcessClass::Shell,
        working_dir: None,
        pid: None,
    }
}

async fn test_router(adapter: Arc<MockAdapter>, registry: Arc<SessionRegistry>) -> (CommandRouter, EventBus) {
    let patterns = Arc::new(PatternRegistry::new());
    let bus = EventBus::new();
    let sink: Arc<dyn crate::reconciler::StatusSink> = Arc::new(EventBusSink(bus.clone()));
    let db = Arc::new(test_db().await);
    let linker = Arc::new(Linker::new(db, registry.clone()));
    let config = ReconcilerConfig {
        hook_precedence: std::time::Duration::from_millis(2000),
        min_hold: std::time::Duration::from_millis(1000),
        coalesce_window: std::time::Duration::from_millis(50),
        idle_grace: std::time::Duration::from_millis(300_000),
        parser_options: ParserOptions::default(),
    };
    let reconciler = Arc::new(Reconciler::new(registry, patterns, sink, linker, config));
    (CommandRouter::new(adapter, reconciler, bus.clone(), 150, 4), bus)
}

#[tokio::test]
async fn send_text_with_default_flags_sends_text_then_enter() {
    let adapter = Arc::new(MockAdapter::new());
    adapter.seed_terminal(terminal("t1", "g1"));
    let (router, _bus) = test_router(adapter.clone(), Arc::new(SessionRegistry::new())).await;

    let flags = SendTextFlags { submit: true, permission_response: false };
    let reply = router.dispatch(ClientCommand::SendText { terminal_id: "t1".to_owned(), text: "ls".to_owned(), flags }).await;

    assert!(reply.ok);
    assert_eq!(adapter.sent_text(), vec![("t1".to_owned(), "ls".to_owned())]);
    assert_eq!(adapter.sent_keys(), vec![("t1".to_owned(), "Enter".to_owned())]);
}

#[tokio::test]
async fn send_text_permission_response_suppresses_enter() {
    let adapter = Arc::new(MockAdapter::new());
    adapter.seed_terminal(terminal("t1", "g1"));
    let (router, _bus) = test_router(adapter.clone(), Arc::new(SessionRegistry::new())).await;

    let flags = SendTextFlags { submit: true, permission_response: true };
    let reply = router.dispatch(ClientCommand::SendText { terminal_id: "t1".to_owned(), text: "y".to_owned(), flags }).await;

    assert!(reply.ok);
    assert_eq!(adapter.sent_text(), vec![("t1".to_owned(), "y".to_owned())]);
    assert!(adapter.sent_keys().is_empty());
}

#[tokio::test]
async fn send_signal_interrupt_maps_to_ctrl_c() {
    let adapter = Arc::new(MockAdapter::new());
    adapter.seed_terminal(terminal("t1", "g1"));
    let (router, _bus) = test_router(adapter.clone(), Arc::new(SessionRegistry::new())).await;

    let reply = router.dispatch(ClientCommand::SendSignal { terminal_id: "t1".to_owned(), signal: "interrupt".to_owned() }).await;

    assert!(reply.ok);
    assert_eq!(adapter.sent_keys(), vec![("t1".to_owned(), "C-c".to_owned())]);
}

#[tokio::test]
async fn send_signal_unknown_errs_without_touching_adapter() {
    let adapter = Arc::new(MockAdapter::new());
    adapter.seed_terminal(terminal("t1", "g1"));
    let (router, _bus) = test_router(adapter.clone(), Arc::new(SessionRegistry::new())).await;

    let reply = router.dispatch(ClientCommand::SendSignal { terminal_id: "t1".to_owned(), signal: "bogus".to_owned() }).await;

    assert!(!reply.ok);
    assert!(adapter.sent_keys().is_empty());
}

#[tokio::test]
async fn dismiss_waiting_ok_when_currently_waiting() {
    let adapter = Arc::new(MockAdapter::new());
    let registry = Arc::new(SessionRegistry::new());
    registry.create_if_absent("t1", SystemTime::now()).await;
    registry.try_set_status("t1", SessionStatus::Waiting, StatusSource::Terminal, SystemTime::now()).await.unwrap();
    let (router, _bus) = test_router(adapter, registry).await;

    let reply = router.dispatch(ClientCommand::DismissWaiting { terminal_id: "t1".to_owned() }).await;

    assert!(reply.ok);
}

#[tokio::test]
async fn dismiss_waiting_errs_when_not_waiting() {
    let adapter = Arc::new(MockAdapter::new());
    let registry = Arc::new(SessionRegistry::new());
    registry.create_if_absent("t1", SystemTime::now()).await;
    let (router, _bus) = test_router(adapter, registry).await;

    let reply = router.dispatch(ClientCommand::DismissWaiting { terminal_id: "t1".to_owned() }).await;

    assert!(!reply.ok);
}

#[tokio::test]
async fn refresh_captures_and_publishes_terminal_captured() {
    let adapter = Arc::new(MockAdapter::new());
    adapter.seed_terminal(terminal("t1", "g1"));
    adapter.set_capture("t1", "some output");
    let (router, bus) = test_router(adapter, Arc::new(SessionRegistry::new())).await;
    let subscription = bus.subscribe().await;

    let reply = router.dispatch(ClientCommand::Refresh { terminal_id: "t1".to_owned() }).await;

    assert!(reply.ok);
    let event = subscription.recv().await;
    assert!(matches!(event, BusEvent::TerminalCaptured { terminal_id, buffer } if terminal_id == "t1" && buffer == "some output"));
}

#[tokio::test]
async fn close_passes_through_to_adapter() {
    let adapter = Arc::new(MockAdapter::new());
    adapter.seed_terminal(terminal("t1", "g1"));
    let (router, _bus) = test_router(adapter.clone(), Arc::new(SessionRegistry::new())).await;

    let reply = router.dispatch(ClientCommand::Close { terminal_id: "t1".to_owned() }).await;

    assert!(reply.ok);
    assert!(adapter.list_terminals().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_pane_rejects_once_group_is_at_capacity() {
    let adapter = Arc::new(MockAdapter::new());
    for i in 0..4 {
        adapter.seed_terminal(terminal(&format!("t{i}"), "g1"));
    }
    let (router, _bus) = test_router(adapter, Arc::new(SessionRegistry::new())).await;

    let reply = router.dispatch(ClientCommand::CreatePane { group_id: "g1".to_owned() }).await;

    assert!(!reply.ok);
}

#[tokio::test]
async fn create_pane_succeeds_below_capacity() {
    let adapter = Arc::new(MockAdapter::new());
    adapter.seed_terminal(terminal("t0", "g1"));
    let (router, _bus) = test_router(adapter, Arc::new(SessionRegistry::new())).await;

    let reply = router.dispatch(ClientCommand::CreatePane { group_id: "g1".to_owned() }).await;

    assert!(reply.ok);
}

#[tokio::test]
async fn create_group_and_rename_group_pass_through() {
    let adapter = Arc::new(MockAdapter::new());
    let (router, _bus) = test_router(adapter, Arc::new(SessionRegistry::new())).await;

    let reply = router.dispatch(ClientCommand::CreateGroup { session: "main".to_owned(), name: "agents".to_owned() }).await;
    assert!(reply.ok);

    let reply = router.dispatch(ClientCommand::RenameGroup { group_id: "g1".to_owned(), name: "renamed".to_owned() }).await;
    assert!(reply.ok);
}
