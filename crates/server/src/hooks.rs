// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! `POST /hook` (§4.9, §6.4): the small authenticated endpoint assistant
//! hooks call. Converts a payload into an `assistant:hook` event,
//! deduplicated by `event_id`.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use paneboard_core::bus::{BusEvent, HookKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::NewEvent;
use crate::state::AppState;

/// `POST /hook` request body, per §6.4.
#[derive(Debug, Clone, Deserialize)]
pub struct HookPayload {
    pub event_id: String,
    pub terminal_id: String,
    pub kind: HookKind,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HookReply {
    fn ok() -> Self {
        Self { ok: true, error: None }
    }

    fn err(message: impl Into<String>) -> Self {
        Self { ok: false, error: Some(message.into()) }
    }
}

pub async fn hook(State(state): State<Arc<AppState>>, Json(body): Json<HookPayload>) -> Json<HookReply> {
    let payload_value = body.payload.clone().unwrap_or(serde_json::json!({}));
    let payload_json = payload_value.to_string();
    let now = Utc::now();

    let persona_id = if let Some(session_id) = &body.session_id {
        match state.linker.link_persona(&body.terminal_id, session_id).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "persona link failed");
                None
            }
        }
    } else {
        None
    };

    let inserted = match state
        .db
        .insert_hook_event(NewEvent {
            event_id: &body.event_id,
            terminal_id: &body.terminal_id,
            persona_id: persona_id.as_deref(),
            project_id: None,
            event_type: "assistant:hook",
            tool_name: body.tool.as_deref(),
            payload: &payload_json,
            created_at: now,
        })
        .await
    {
        Ok(inserted) => inserted,
        Err(e) => {
            warn!(error = %e, "hook event persistence failed");
            return Json(HookReply::err("persistence failure"));
        }
    };

    if !inserted {
        debug!(event_id = %body.event_id, "duplicate hook event discarded");
        return Json(HookReply::ok());
    }

    state
        .bus
        .publish(BusEvent::AssistantHook {
            terminal_id: body.terminal_id.clone(),
            kind: body.kind,
            payload: payload_value,
        })
        .await;

    Json(HookReply::ok())
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
