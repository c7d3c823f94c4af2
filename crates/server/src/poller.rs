// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Periodically lists terminals via the multiplexer adapter and publishes
//! `multiplexer:snapshot` / `terminal:captured` events. Holds no cross-tick
//! state beyond the timer and the adapter handle, per §4.5.

use std::sync::Arc;
use std::time::Duration;

use paneboard_core::bus::{BusEvent, EventBus};
use paneboard_core::terminal::ProcessClass;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapter::MuxAdapter;

/// Spawn the poller loop. Returns a handle that, when dropped after the
/// `cancel` token fires, indicates the task has stopped.
pub fn spawn(
    adapter: Arc<dyn MuxAdapter>,
    bus: EventBus,
    capture_lines: usize,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let terminals = match adapter.list_terminals().await {
                Ok(terminals) => terminals,
                Err(e) => {
                    warn!(error = %e, "multiplexer snapshot failed, publishing empty snapshot");
                    Vec::new()
                }
            };

            let groups: Vec<String> = {
                let mut groups: Vec<String> =
                    terminals.iter().map(|t| t.group_id.clone()).collect();
                groups.sort();
                groups.dedup();
                groups
            };

            bus.publish(BusEvent::MultiplexerSnapshot { groups, terminals: terminals.clone() }).await;

            for terminal in &terminals {
                if terminal.process != ProcessClass::Assistant {
                    continue;
                }
                match adapter.capture(&terminal.id, capture_lines).await {
                    Ok(buffer) => {
                        bus.publish(BusEvent::TerminalCaptured {
                            terminal_id: terminal.id.clone(),
                            buffer,
                        })
                        .await;
                    }
                    Err(e) => {
                        debug!(terminal_id = %terminal.id, error = %e, "capture failed");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
