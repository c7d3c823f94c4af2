// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use super::*;
use paneboard_core::terminal::{ProcessClass, Terminal};

fn terminal(id: &str) -> Terminal {
    Terminal {
        id: id.to_owned(),
        group_id: "g1".to_owned(),
        index: 0,
        active: true,
        width: 80,
        height: 24,
        process: ProcessClass::Assistant,
        working_dir: None,
        pid: Some(1234),
    }
}

#[tokio::test]
async fn seeded_terminal_is_listed() {
    let adapter = MockAdapter::new();
    adapter.seed_terminal(terminal("t1"));
    let terminals = adapter.list_terminals().await.unwrap();
    assert_eq!(terminals.len(), 1);
    assert_eq!(terminals[0].id, "t1");
}

#[tokio::test]
async fn capture_returns_seeded_content() {
    let adapter = MockAdapter::new();
    adapter.seed_terminal(terminal("t1"));
    adapter.set_capture("t1", "hello");
    assert_eq!(adapter.capture("t1", 10).await.unwrap(), "hello");
}

#[tokio::test]
async fn send_text_to_unknown_terminal_fails() {
    let adapter = MockAdapter::new();
    assert!(adapter.send_text("missing", "hi").await.is_err());
}

#[tokio::test]
async fn send_text_records_call() {
    let adapter = MockAdapter::new();
    adapter.seed_terminal(terminal("t1"));
    adapter.send_text("t1", "hello").await.unwrap();
    assert_eq!(adapter.sent_text(), vec![("t1".to_owned(), "hello".to_owned())]);
}

#[tokio::test]
async fn close_pane_removes_terminal() {
    let adapter = MockAdapter::new();
    adapter.seed_terminal(terminal("t1"));
    adapter.close_pane("t1").await.unwrap();
    assert!(adapter.list_terminals().await.unwrap().is_empty());
}
