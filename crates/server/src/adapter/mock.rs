// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! An in-memory [`MuxAdapter`] used by poller, reconciler, and command
//! surface tests so they never depend on a real terminal multiplexer.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use paneboard_core::terminal::{ProcessClass, Terminal};

use super::{AdapterError, MuxAdapter};

struct MockState {
    terminals: HashMap<String, Terminal>,
    captures: HashMap<String, String>,
    sent_text: Vec<(String, String)>,
    sent_keys: Vec<(String, String)>,
    next_id: u64,
}

/// A scriptable in-memory multiplexer. Panics are never reachable from
/// production code paths that use it; only test code touches this type.
pub struct MockAdapter {
    state: Mutex<MockState>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                terminals: HashMap::new(),
                captures: HashMap::new(),
                sent_text: Vec::new(),
                sent_keys: Vec::new(),
                next_id: 0,
            }),
        }
    }

    pub fn seed_terminal(&self, terminal: Terminal) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.terminals.insert(terminal.id.clone(), terminal);
    }

    pub fn set_capture(&self, terminal_id: &str, content: &str) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.captures.insert(terminal_id.to_owned(), content.to_owned());
    }

    pub fn remove_terminal(&self, terminal_id: &str) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.terminals.remove(terminal_id);
    }

    pub fn sent_text(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).sent_text.clone()
    }

    pub fn sent_keys(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).sent_keys.clone()
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MuxAdapter for MockAdapter {
    async fn list_terminals(&self) -> Result<Vec<Terminal>, AdapterError> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        Ok(state.terminals.values().cloned().collect())
    }

    async fn capture(&self, terminal_id: &str, _lines: usize) -> Result<String, AdapterError> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        Ok(state.captures.get(terminal_id).cloned().unwrap_or_default())
    }

    async fn send_text(&self, terminal_id: &str, text: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if !state.terminals.contains_key(terminal_id) {
            return Err(AdapterError(format!("unknown terminal {terminal_id}")));
        }
        state.sent_text.push((terminal_id.to_owned(), text.to_owned()));
        Ok(())
    }

    async fn send_key(&self, terminal_id: &str, key_name: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if !state.terminals.contains_key(terminal_id) {
            return Err(AdapterError(format!("unknown terminal {terminal_id}")));
        }
        state.sent_keys.push((terminal_id.to_owned(), key_name.to_owned()));
        Ok(())
    }

    async fn create_pane(&self, group_id: &str) -> Result<Terminal, AdapterError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.next_id += 1;
        let terminal = Terminal {
            id: format!("mock-pane-{}", state.next_id),
            group_id: group_id.to_owned(),
            index: state.next_id as u32,
            active: true,
            width: 80,
            height: 24,
            process: ProcessClass::Shell,
            working_dir: None,
            pid: None,
        };
        state.terminals.insert(terminal.id.clone(), terminal.clone());
        Ok(terminal)
    }

    async fn create_group(&self, _session_name: &str, name: &str) -> Result<String, AdapterError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.next_id += 1;
        Ok(format!("mock-group-{}-{}", state.next_id, name))
    }

    async fn close_pane(&self, id: &str) -> Result<(), AdapterError> {
        self.remove_terminal(id);
        Ok(())
    }

    async fn close_group(&self, group_id: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.terminals.retain(|_, t| t.group_id != group_id);
        Ok(())
    }

    async fn rename_group(&self, _id: &str, _name: &str) -> Result<(), AdapterError> {
        Ok(())
    }
}
