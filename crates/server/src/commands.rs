// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! External command surface, client-to-server half (C9, §4.9): dispatches
//! a [`ClientCommand`] against the multiplexer adapter and the
//! reconciler. Adapter pass-through calls share a bounded concurrency
//! permit so a client flooding the socket with commands cannot starve the
//! multiplexer; `create_pane` additionally enforces a max-panes-per-group
//! cap.
//!
//! `refresh` has no dedicated adapter verb (§6.3 lists none), so it is
//! implemented as an immediate `capture` fed onto the bus as
//! `terminal:captured` — the same event the poller would eventually
//! produce, just without waiting for the next tick. Every other command
//! converges through the next poll cycle's `multiplexer:snapshot` rather
//! than broadcasting directly, matching the poller's role as sole
//! snapshot source.

use std::sync::Arc;

use paneboard_core::bus::{BusEvent, EventBus};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::adapter::MuxAdapter;
use crate::reconciler::Reconciler;
use crate::wire::{ClientCommand, CommandReply};

const MAX_CONCURRENT_COMMANDS: usize = 16;

pub struct CommandRouter {
    adapter: Arc<dyn MuxAdapter>,
    reconciler: Arc<Reconciler>,
    bus: EventBus,
    capture_lines: usize,
    max_panes_per_group: usize,
    inflight: Semaphore,
}

impl CommandRouter {
    pub fn new(
        adapter: Arc<dyn MuxAdapter>,
        reconciler: Arc<Reconciler>,
        bus: EventBus,
        capture_lines: usize,
        max_panes_per_group: usize,
    ) -> Self {
        Self { adapter, reconciler, bus, capture_lines, max_panes_per_group, inflight: Semaphore::new(MAX_CONCURRENT_COMMANDS) }
    }

    pub async fn dispatch(&self, command: ClientCommand) -> CommandReply {
        match command {
            ClientCommand::SendText { terminal_id, text, flags } => self.send_text(&terminal_id, &text, flags).await,
            ClientCommand::SendSignal { terminal_id, signal } => self.send_signal(&terminal_id, &signal).await,
            ClientCommand::DismissWaiting { terminal_id } => self.dismiss_waiting(&terminal_id).await,
            ClientCommand::Refresh { terminal_id } => self.refresh(&terminal_id).await,
            ClientCommand::Close { terminal_id } => self.close(&terminal_id).await,
            ClientCommand::CreatePane { group_id } => self.create_pane(&group_id).await,
            ClientCommand::CreateGroup { session, name } => self.create_group(&session, &name).await,
            ClientCommand::RenameGroup { group_id, name } => self.rename_group(&group_id, &name).await,
        }
    }

    async fn permit(&self) -> Option<tokio::sync::SemaphorePermit<'_>> {
        self.inflight.acquire().await.ok()
    }

    async fn send_text(&self, terminal_id: &str, text: &str, flags: crate::wire::SendTextFlags) -> CommandReply {
        let Some(_permit) = self.permit().await else { return CommandReply::err("internal") };
        if let Err(e) = self.adapter.send_text(terminal_id, text).await {
            warn!(terminal_id, "send_text failed");
            return CommandReply::err(e.to_string());
        }
        if flags.submit && !flags.permission_response {
            if let Err(e) = self.adapter.send_key(terminal_id, "Enter").await {
                warn!(terminal_id, "send_text enter-key failed");
                return CommandReply::err(e.to_string());
            }
        }
        CommandReply::ok()
    }

    async fn send_signal(&self, terminal_id: &str, signal: &str) -> CommandReply {
        let Some(_permit) = self.permit().await else { return CommandReply::err("internal") };
        let Some(key) = signal_to_key(signal) else {
            return CommandReply::err(format!("unknown signal {signal}"));
        };
        match self.adapter.send_key(terminal_id, &key).await {
            Ok(()) => CommandReply::ok(),
            Err(e) => CommandReply::err(e.to_string()),
        }
    }

    async fn dismiss_waiting(&self, terminal_id: &str) -> CommandReply {
        match self.reconciler.dismiss_waiting(terminal_id).await {
            Ok(true) => CommandReply::ok(),
            Ok(false) | Err(_) => CommandReply::err("session is not waiting"),
        }
    }

    async fn refresh(&self, terminal_id: &str) -> CommandReply {
        let Some(_permit) = self.permit().await else { return CommandReply::err("internal") };
        match self.adapter.capture(terminal_id, self.capture_lines).await {
            Ok(buffer) => {
                self.bus.publish(BusEvent::TerminalCaptured { terminal_id: terminal_id.to_owned(), buffer }).await;
                CommandReply::ok()
            }
            Err(e) => CommandReply::err(e.to_string()),
        }
    }

    async fn close(&self, terminal_id: &str) -> CommandReply {
        let Some(_permit) = self.permit().await else { return CommandReply::err("internal") };
        match self.adapter.close_pane(terminal_id).await {
            Ok(()) => CommandReply::ok(),
            Err(e) => CommandReply::err(e.to_string()),
        }
    }

    async fn create_pane(&self, group_id: &str) -> CommandReply {
        let Some(_permit) = self.permit().await else { return CommandReply::err("internal") };
        let existing = match self.adapter.list_terminals().await {
            Ok(terminals) => terminals.iter().filter(|t| t.group_id == group_id).count(),
            Err(e) => return CommandReply::err(e.to_string()),
        };
        if existing >= self.max_panes_per_group {
            return CommandReply::err(format!("group {group_id} already has the maximum of {} panes", self.max_panes_per_group));
        }
        match self.adapter.create_pane(group_id).await {
            Ok(_terminal) => CommandReply::ok(),
            Err(e) => CommandReply::err(e.to_string()),
        }
    }

    async fn create_group(&self, session: &str, name: &str) -> CommandReply {
        let Some(_permit) = self.permit().await else { return CommandReply::err("internal") };
        match self.adapter.create_group(session, name).await {
            Ok(_group_id) => CommandReply::ok(),
            Err(e) => CommandReply::err(e.to_string()),
        }
    }

    async fn rename_group(&self, group_id: &str, name: &str) -> CommandReply {
        let Some(_permit) = self.permit().await else { return CommandReply::err("internal") };
        match self.adapter.rename_group(group_id, name).await {
            Ok(()) => CommandReply::ok(),
            Err(e) => CommandReply::err(e.to_string()),
        }
    }
}

/// Translate a signal name to the multiplexer's key syntax. Generalizes
/// the generic ctrl-letter handling into tmux-native `C-<letter>` output
/// instead of a raw control byte, since `MuxAdapter::send_key` forwards
/// its argument straight to `tmux send-keys`.
fn signal_to_key(signal: &str) -> Option<String> {
    let lower = signal.to_lowercase();
    match lower.as_str() {
        "interrupt" | "sigint" => Some("C-c".to_owned()),
        "eof" | "sigeof" => Some("C-d".to_owned()),
        "suspend" | "sigtstp" => Some("C-z".to_owned()),
        "quit" | "sigquit" => Some("C-\\".to_owned()),
        _ => {
            let ch_str = lower.strip_prefix("ctrl-")?;
            let ch = ch_str.chars().next()?;
            ch.is_ascii_lowercase().then(|| format!("C-{ch}"))
        }
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
