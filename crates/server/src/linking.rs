// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Persona/project resolution (§3, §4.7): personas are seeded
//! deterministically from an incoming session identifier (at-most-one
//! persona per identifier); projects are created on demand from a
//! terminal's working directory once it resolves to a version-controlled
//! root.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use paneboard_core::session::SessionRegistry;
use uuid::Uuid;

use crate::db::Db;

/// Namespace for persona/project id derivation — fixed so the same
/// external key always yields the same uuid across restarts.
const PERSONA_NAMESPACE: Uuid = Uuid::from_bytes([
    0x70, 0x61, 0x6e, 0x65, 0x62, 0x6f, 0x61, 0x72, 0x64, 0x2d, 0x70, 0x65, 0x72, 0x73, 0x6f, 0x6e,
]);
const PROJECT_NAMESPACE: Uuid = Uuid::from_bytes([
    0x70, 0x61, 0x6e, 0x65, 0x62, 0x6f, 0x61, 0x72, 0x64, 0x2d, 0x70, 0x72, 0x6f, 0x6a, 0x65, 0x63,
]);

/// Deterministically derive a persona id from an external session
/// identifier. Stable across process restarts and duplicate hook
/// deliveries — the same `session_id` always maps to the same persona.
pub fn derive_persona_id(session_id: &str) -> String {
    Uuid::new_v5(&PERSONA_NAMESPACE, session_id.as_bytes()).to_string()
}

/// Deterministically derive a project id from a resolved VCS root path.
pub fn derive_project_id(root_path: &str) -> String {
    Uuid::new_v5(&PROJECT_NAMESPACE, root_path.as_bytes()).to_string()
}

/// Walk upward from `working_dir` looking for a `.git` entry. Returns the
/// first ancestor (inclusive) that contains one, or `None` if the walk
/// reaches the filesystem root without finding it.
pub fn resolve_vcs_root(working_dir: &str) -> Option<String> {
    let mut dir: PathBuf = Path::new(working_dir).to_path_buf();
    loop {
        if dir.join(".git").exists() {
            return Some(dir.to_string_lossy().into_owned());
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Resolves and persists persona/project links for a session, then
/// writes them onto the in-memory registry so `SessionInfo` can surface
/// them without a DB round trip per request.
pub struct Linker {
    db: Arc<Db>,
    registry: Arc<SessionRegistry>,
}

impl Linker {
    pub fn new(db: Arc<Db>, registry: Arc<SessionRegistry>) -> Self {
        Self { db, registry }
    }

    /// Link a terminal's session to a persona derived from `session_id`,
    /// seeding the `personas` row if this is the first sighting.
    pub async fn link_persona(&self, terminal_id: &str, session_id: &str) -> Result<String, crate::error::CoreError> {
        let persona_id = derive_persona_id(session_id);
        self.db.upsert_persona(&persona_id, session_id, Utc::now()).await?;
        self.registry.set_links(terminal_id, Some(persona_id.clone()), None).await;
        Ok(persona_id)
    }

    /// Link a terminal's session to a project resolved from its working
    /// directory, if any. No-op (returns `None`) when no VCS root is
    /// found — the session simply has no `project_id`.
    pub async fn link_project(&self, terminal_id: &str, working_dir: &str) -> Result<Option<String>, crate::error::CoreError> {
        let Some(root_path) = resolve_vcs_root(working_dir) else {
            return Ok(None);
        };
        let project_id = derive_project_id(&root_path);
        self.db.upsert_project(&project_id, &root_path, Utc::now()).await?;
        self.registry.set_links(terminal_id, None, Some(project_id.clone())).await;
        Ok(Some(project_id))
    }
}

#[cfg(test)]
#[path = "linking_tests.rs"]
mod tests;
