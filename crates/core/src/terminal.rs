// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! The `Terminal` entity (§3): external identity produced by the
//! multiplexer poller, never owned long-term by the core.

use serde::{Deserialize, Serialize};

/// Tagged classification of the process owning a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessClass {
    Assistant,
    Shell,
    GenericProcess,
    Empty,
}

impl ProcessClass {
    /// Only an `assistant` terminal may have an associated session.
    pub fn can_own_session(self) -> bool {
        matches!(self, ProcessClass::Assistant)
    }
}

/// A terminal as reported by the multiplexer adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    pub id: String,
    pub group_id: String,
    pub index: u32,
    pub active: bool,
    pub width: u16,
    pub height: u16,
    pub process: ProcessClass,
    pub working_dir: Option<String>,
    pub pid: Option<u32>,
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
