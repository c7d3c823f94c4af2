// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use super::*;

#[test]
fn client_ids_are_unique_and_monotonic() {
    let a = next_client_id();
    let b = next_client_id();
    assert_ne!(a, b);
    assert!(a.starts_with("ws-"));
    assert!(b.starts_with("ws-"));
}

#[test]
fn query_without_token_parses() {
    let query: WsQuery = serde_json::from_str("{}").unwrap();
    assert!(query.token.is_none());
}

#[test]
fn query_with_token_parses() {
    let query: WsQuery = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
    assert_eq!(query.token.as_deref(), Some("abc"));
}

#[tokio::test]
async fn connecting_client_receives_connected_frame_shape() {
    // Exercises the same ServerMessage construction handle_connection uses,
    // without standing up a real socket.
    let connected = ServerMessage::Connected { session_id: "ws-1".to_owned(), timestamp: Utc::now().to_rfc3339() };
    let json = serde_json::to_string(&connected).unwrap();
    assert!(json.contains("\"type\":\"connected\""));
    assert!(json.contains("\"session_id\":\"ws-1\""));
}
