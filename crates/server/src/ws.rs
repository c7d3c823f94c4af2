// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! `GET /ws` (§6.2): the WebSocket upgrade handler and per-connection
//! event loop. Outgoing frames come from the client's [`ClientHandle`]
//! queue (fed by [`crate::fanout`] via the broadcast fabric); incoming
//! text frames are parsed as [`ClientCommand`]s and run through the
//! shared [`CommandRouter`], replying with the uniform `{ok, error?}`
//! shape inline rather than via the fabric.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use paneboard_core::bus::BusEvent;
use serde::Deserialize;
use tracing::debug;

use crate::auth;
use crate::state::AppState;
use crate::wire::{ClientCommand, CommandReply, ServerMessage};

/// A client send has at most this long to complete before it is
/// considered failed, per §5.
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_client_id() -> String {
    format!("ws-{}", NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

pub async fn ws_handler(State(state): State<Arc<AppState>>, Query(query): Query<WsQuery>, ws: WebSocketUpgrade) -> impl IntoResponse {
    if auth::validate_query_token(query.token.as_deref(), state.config.auth_token.as_deref()).is_err() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| handle_connection(state, socket)).into_response()
}

async fn handle_connection(state: Arc<AppState>, socket: WebSocket) {
    let client_id = next_client_id();
    let handle = state.fabric.register(client_id.clone()).await;
    let Some(mut outbox) = handle.take_receiver().await else { return };
    state.bus.publish(BusEvent::ClientConnected { client_id: client_id.clone() }).await;

    let (mut ws_tx, mut ws_rx) = socket.split();

    let connected = ServerMessage::Connected { session_id: client_id.clone(), timestamp: Utc::now().to_rfc3339() };
    if let Ok(json) = serde_json::to_string(&connected) {
        let _ = ws_tx.send(Message::Text(json.into())).await;
    }

    loop {
        tokio::select! {
            frame = outbox.recv() => {
                let Some(frame) = frame else { break };
                let sent = tokio::time::timeout(WRITE_TIMEOUT, ws_tx.send(Message::Text(frame.payload.to_string().into()))).await;
                match sent {
                    Ok(Ok(())) => handle.note_sent(frame.len),
                    _ => {
                        debug!(client_id = %client_id, "write failed or timed out, dropping client");
                        break;
                    }
                }
            }
            incoming = ws_rx.next() => {
                let Some(Ok(message)) = incoming else { break };
                match message {
                    Message::Text(text) => {
                        let reply = match serde_json::from_str::<ClientCommand>(&text) {
                            Ok(command) => state.commands.dispatch(command).await,
                            Err(_) => CommandReply::err("malformed command"),
                        };
                        let Ok(json) = serde_json::to_string(&reply) else { continue };
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    handle.disconnect().await;
    state.bus.publish(BusEvent::ClientDisconnected { client_id }).await;
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
