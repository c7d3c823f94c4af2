// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Wire types for the WebSocket protocol (§6.1, §6.2): messages tagged by
//! `type`, each carrying an implicit [`Priority`] the broadcast fabric
//! consults on delivery.

use paneboard_core::session::{LastError, SessionRecord, StatusSource};
use paneboard_core::state_machine::SessionStatus;
use serde::{Deserialize, Serialize};

/// Delivery priority, per §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Normal,
    Low,
}

/// A logical container of terminals sharing a name and index (the
/// multiplexer's "window").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub index: u32,
    pub pane_ids: Vec<String>,
}

/// Per-session view sent to clients inside a `pane_update` message.
///
/// Gamification fields (`tier`, `badges`, `health`, `stats`, `tokens`, …)
/// are out of scope (§1) and always `None` here; they are carried as
/// optional wire fields only so a richer producer could populate them
/// without a protocol break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub status: SessionStatus,
    pub status_source: StatusSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_prompt: Option<paneboard_core::parser::TerminalPrompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<LastError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_subagents: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    pub needs_attention: bool,
}

impl From<&SessionRecord> for SessionInfo {
    fn from(record: &SessionRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.terminal_id.clone(),
            avatar: None,
            status: record.status,
            status_source: record.status_source,
            tier: None,
            badges: None,
            personality: None,
            health: None,
            stats: None,
            terminal_prompt: record.terminal_prompt.clone(),
            pending_question: None,
            last_error: record.last_error.clone(),
            active_subagents: None,
            tokens: None,
            needs_attention: record.needs_attention(),
        }
    }
}

/// Server-to-client messages, tagged by `type` per §6.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "connected")]
    Connected { session_id: String, timestamp: String },

    #[serde(rename = "windows")]
    Windows { payload: Vec<Group> },

    #[serde(rename = "pane_update")]
    PaneUpdate { pane_id: String, session: SessionInfo },

    #[serde(rename = "pane_removed")]
    PaneRemoved { pane_id: String },

    #[serde(rename = "terminal_output")]
    TerminalOutput { payload: TerminalOutputPayload },

    #[serde(rename = "terminal_diff")]
    TerminalDiff { payload: TerminalDiffPayload },

    #[serde(rename = "error")]
    Error { code: String, message: String },

    #[serde(rename = "event")]
    Event { payload: ActivityEvent },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalOutputPayload {
    pub pane_id: String,
    pub target: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalDiffPayload {
    pub pane_id: String,
    pub target: String,
    pub ops: serde_json::Value,
    pub seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pane_id: Option<String>,
    pub timestamp: String,
}

impl ServerMessage {
    /// Priority consulted by the broadcast fabric (§4.8). Domain-specific
    /// catalogue messages not modeled here (personas/projects/quests/xp —
    /// out of scope, §1) would be NORMAL if a future producer adds them.
    pub fn priority(&self) -> Priority {
        match self {
            ServerMessage::PaneUpdate { .. }
            | ServerMessage::PaneRemoved { .. }
            | ServerMessage::TerminalOutput { .. }
            | ServerMessage::TerminalDiff { .. }
            | ServerMessage::Error { .. } => Priority::High,
            ServerMessage::Connected { .. } | ServerMessage::Windows { .. } => Priority::Normal,
            ServerMessage::Event { .. } => Priority::Low,
        }
    }
}

/// Flags on `send_text`, per §4.9.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SendTextFlags {
    #[serde(default = "default_true")]
    pub submit: bool,
    #[serde(default)]
    pub permission_response: bool,
}

impl Default for SendTextFlags {
    fn default() -> Self {
        Self { submit: true, permission_response: false }
    }
}

fn default_true() -> bool {
    true
}

/// Client-to-server commands, per §4.9/§6.2. Each is a flat JSON object
/// `{command, ...args}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    SendText { terminal_id: String, text: String, #[serde(default)] flags: SendTextFlags },
    SendSignal { terminal_id: String, signal: String },
    DismissWaiting { terminal_id: String },
    Refresh { terminal_id: String },
    Close { terminal_id: String },
    CreatePane { group_id: String },
    CreateGroup { session: String, name: String },
    RenameGroup { group_id: String, name: String },
}

/// The uniform `{ok, error?}` reply every command returns, per §4.9.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandReply {
    pub fn ok() -> Self {
        Self { ok: true, error: None }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { ok: false, error: Some(message.into()) }
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
