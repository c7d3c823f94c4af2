// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! In-process typed pub/sub. Delivery is sequential within one subscriber
//! but fire-and-forget between publisher and subscriber: a slow or absent
//! subscriber never blocks the publisher or any other subscriber.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::session::StatusChange;
use crate::state_machine::SessionStatus;
use crate::terminal::Terminal;

/// The `kind` carried by an `assistant:hook` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    PreToolUse,
    PostToolUse,
    Stop,
    UserPrompt,
    SubagentStart,
    SubagentStop,
    Error,
}

/// Every named event the core publishes, per the event bus contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum BusEvent {
    #[serde(rename = "multiplexer:snapshot")]
    MultiplexerSnapshot { groups: Vec<String>, terminals: Vec<Terminal> },

    #[serde(rename = "assistant:hook")]
    AssistantHook { terminal_id: String, kind: HookKind, payload: serde_json::Value },

    #[serde(rename = "session:status_changed")]
    SessionStatusChanged {
        terminal_id: String,
        persona_id: Option<String>,
        old_status: SessionStatus,
        new_status: SessionStatus,
    },

    #[serde(rename = "session:error_set")]
    SessionErrorSet { terminal_id: String, tool: String, message: Option<String> },

    #[serde(rename = "session:error_cleared")]
    SessionErrorCleared { terminal_id: String },

    #[serde(rename = "terminal:captured")]
    TerminalCaptured { terminal_id: String, buffer: String },

    #[serde(rename = "client:connected")]
    ClientConnected { client_id: String },

    #[serde(rename = "client:disconnected")]
    ClientDisconnected { client_id: String },
}

impl BusEvent {
    /// High-priority events are exempt from the overflow-eviction policy.
    fn is_high_priority(&self) -> bool {
        matches!(
            self,
            BusEvent::SessionStatusChanged { .. }
                | BusEvent::SessionErrorSet { .. }
                | BusEvent::SessionErrorCleared { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            BusEvent::MultiplexerSnapshot { .. } => "multiplexer:snapshot",
            BusEvent::AssistantHook { .. } => "assistant:hook",
            BusEvent::SessionStatusChanged { .. } => "session:status_changed",
            BusEvent::SessionErrorSet { .. } => "session:error_set",
            BusEvent::SessionErrorCleared { .. } => "session:error_cleared",
            BusEvent::TerminalCaptured { .. } => "terminal:captured",
            BusEvent::ClientConnected { .. } => "client:connected",
            BusEvent::ClientDisconnected { .. } => "client:disconnected",
        }
    }
}

impl From<StatusChange> for BusEvent {
    fn from(change: StatusChange) -> Self {
        BusEvent::SessionStatusChanged {
            terminal_id: change.terminal_id,
            persona_id: change.persona_id,
            old_status: change.old_status,
            new_status: change.new_status,
        }
    }
}

const DEFAULT_QUEUE_DEPTH: usize = 1024;

struct Inbox {
    queue: Mutex<VecDeque<BusEvent>>,
    notify: Notify,
    dropped: AtomicU64,
    capacity: usize,
}

impl Inbox {
    /// Push `event`, applying the bus's overflow policy when full. Returns
    /// `true` if the event landed in the queue for at least one instant
    /// (it may still be evicted later by a subsequent overflow).
    async fn push(&self, event: BusEvent) {
        let mut queue = self.queue.lock().await;
        if queue.len() < self.capacity {
            queue.push_back(event);
            drop(queue);
            self.notify.notify_one();
            return;
        }
        // Full: evict the oldest non-high-priority entry to make room.
        if let Some(idx) = queue.iter().position(|e| !e.is_high_priority()) {
            queue.remove(idx);
            queue.push_back(event);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            drop(queue);
            self.notify.notify_one();
        } else {
            // Queue is saturated with high-priority events; the new event
            // (whatever its priority) has nowhere to land.
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn pop(&self) -> BusEvent {
        loop {
            {
                let mut queue = self.queue.lock().await;
                if let Some(event) = queue.pop_front() {
                    return event;
                }
            }
            self.notify.notified().await;
        }
    }
}

/// The receiving half handed back to a caller of [`EventBus::subscribe`].
pub struct Subscription {
    inbox: Arc<Inbox>,
}

impl Subscription {
    /// Wait for and return the next event for this subscriber, in order.
    pub async fn recv(&self) -> BusEvent {
        self.inbox.pop().await
    }

    /// Count of events dropped for this subscriber since it subscribed.
    pub fn dropped_count(&self) -> u64 {
        self.inbox.dropped.load(Ordering::Relaxed)
    }
}

/// Bounded, fire-and-forget pub/sub shared by every producer/consumer in
/// the process (C5, C7, C8, C9).
#[derive(Clone)]
pub struct EventBus {
    queue_depth: usize,
    subscribers: Arc<tokio::sync::RwLock<Vec<Arc<Inbox>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_queue_depth(DEFAULT_QUEUE_DEPTH)
    }

    pub fn with_queue_depth(queue_depth: usize) -> Self {
        Self { queue_depth, subscribers: Arc::new(tokio::sync::RwLock::new(Vec::new())) }
    }

    /// Register a new subscriber, returning its receiving half.
    pub async fn subscribe(&self) -> Subscription {
        let inbox = Arc::new(Inbox {
            queue: Mutex::new(VecDeque::with_capacity(self.queue_depth.min(64))),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            capacity: self.queue_depth,
        });
        self.subscribers.write().await.push(inbox.clone());
        Subscription { inbox }
    }

    /// Publish an event to every subscriber. Delivery to each subscriber
    /// applies that subscriber's overflow policy independently, so one
    /// slow subscriber never affects another.
    pub async fn publish(&self, event: BusEvent) {
        let subscribers = self.subscribers.read().await;
        for inbox in subscribers.iter() {
            inbox.push(event.clone()).await;
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
