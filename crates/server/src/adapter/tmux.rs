// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Shells out to the `tmux` CLI and reads `/proc` for process
//! classification, per §6.3. This is the only module in the workspace
//! that knows tmux's command-line surface; the liveness-check approach is
//! generalized from a plain "is this pid alive" probe into "what is this
//! pid, and what are its children".

use std::path::PathBuf;

use async_trait::async_trait;
use paneboard_core::terminal::{ProcessClass, Terminal};
use tokio::process::Command;

use super::{classify_process, AdapterError, MuxAdapter};

/// Adapter backed by a real `tmux` server.
pub struct TmuxAdapter {
    socket_name: Option<String>,
}

impl TmuxAdapter {
    pub fn new() -> Self {
        Self { socket_name: None }
    }

    pub fn with_socket(socket_name: impl Into<String>) -> Self {
        Self { socket_name: Some(socket_name.into()) }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("tmux");
        if let Some(socket) = &self.socket_name {
            cmd.arg("-L").arg(socket);
        }
        cmd
    }

    async fn run(&self, args: &[&str]) -> Result<String, AdapterError> {
        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(|e| AdapterError(format!("tmux {args:?} failed to spawn: {e}")))?;
        if !output.status.success() {
            return Err(AdapterError(format!(
                "tmux {args:?} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| AdapterError(format!("tmux output not utf8: {e}")))
    }

    fn pid_command(pid: u32) -> Option<String> {
        let comm = std::fs::read_to_string(PathBuf::from(format!("/proc/{pid}/comm"))).ok()?;
        Some(comm.trim().to_owned())
    }

    fn child_pids(pid: u32) -> Vec<u32> {
        let children = std::fs::read_to_string(PathBuf::from(format!("/proc/{pid}/task/{pid}/children")))
            .unwrap_or_default();
        children.split_whitespace().filter_map(|s| s.parse().ok()).collect()
    }

    fn working_dir(pid: u32) -> Option<String> {
        std::fs::read_link(PathBuf::from(format!("/proc/{pid}/cwd")))
            .ok()
            .map(|p| p.to_string_lossy().into_owned())
    }

    fn classify_pid(pid: u32) -> ProcessClass {
        let Some(command) = Self::pid_command(pid) else {
            return ProcessClass::Empty;
        };
        let children: Vec<String> =
            Self::child_pids(pid).into_iter().filter_map(Self::pid_command).collect();
        classify_process(&command, &children)
    }
}

impl Default for TmuxAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MuxAdapter for TmuxAdapter {
    async fn list_terminals(&self) -> Result<Vec<Terminal>, AdapterError> {
        let format = "#{pane_id}\t#{session_name}\t#{window_index}\t#{pane_active}\t#{pane_width}\t#{pane_height}\t#{pane_pid}";
        let raw = self.run(&["list-panes", "-a", "-F", format]).await?;

        let mut terminals = Vec::new();
        for line in raw.lines().filter(|l| !l.is_empty()) {
            let fields: Vec<&str> = line.split('\t').collect();
            let [id, group_id, index, active, width, height, pid_str] = fields.as_slice() else {
                continue;
            };
            let pid: Option<u32> = pid_str.parse().ok();
            let process = pid.map(Self::classify_pid).unwrap_or(ProcessClass::Empty);
            let working_dir = pid.and_then(Self::working_dir);
            terminals.push(Terminal {
                id: (*id).to_owned(),
                group_id: (*group_id).to_owned(),
                index: index.parse().unwrap_or(0),
                active: *active == "1",
                width: width.parse().unwrap_or(80),
                height: height.parse().unwrap_or(24),
                process,
                working_dir,
                pid,
            });
        }
        Ok(terminals)
    }

    async fn capture(&self, terminal_id: &str, lines: usize) -> Result<String, AdapterError> {
        self.run(&["capture-pane", "-p", "-t", terminal_id, "-S", &format!("-{lines}")]).await
    }

    async fn send_text(&self, terminal_id: &str, text: &str) -> Result<(), AdapterError> {
        self.run(&["send-keys", "-t", terminal_id, "-l", text]).await.map(|_| ())
    }

    async fn send_key(&self, terminal_id: &str, key_name: &str) -> Result<(), AdapterError> {
        self.run(&["send-keys", "-t", terminal_id, key_name]).await.map(|_| ())
    }

    async fn create_pane(&self, group_id: &str) -> Result<Terminal, AdapterError> {
        let id = self
            .run(&["split-window", "-t", group_id, "-P", "-F", "#{pane_id}"])
            .await?
            .trim()
            .to_owned();
        Ok(Terminal {
            id,
            group_id: group_id.to_owned(),
            index: 0,
            active: true,
            width: 80,
            height: 24,
            process: ProcessClass::Shell,
            working_dir: None,
            pid: None,
        })
    }

    async fn create_group(&self, session_name: &str, name: &str) -> Result<String, AdapterError> {
        self.run(&["new-window", "-t", session_name, "-n", name, "-P", "-F", "#{window_id}"])
            .await
            .map(|s| s.trim().to_owned())
    }

    async fn close_pane(&self, id: &str) -> Result<(), AdapterError> {
        self.run(&["kill-pane", "-t", id]).await.map(|_| ())
    }

    async fn close_group(&self, id: &str) -> Result<(), AdapterError> {
        self.run(&["kill-window", "-t", id]).await.map(|_| ())
    }

    async fn rename_group(&self, id: &str, name: &str) -> Result<(), AdapterError> {
        self.run(&["rename-window", "-t", id, name]).await.map(|_| ())
    }
}
