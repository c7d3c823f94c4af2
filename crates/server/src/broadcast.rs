// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Backpressure-aware broadcast fabric (C8, §4.8): holds the set of
//! connected clients and fans typed messages out to them with a
//! per-priority drop policy and per-client hysteresis.
//!
//! The registry itself uses a copy-on-write snapshot for reads (a cloned
//! `Vec` behind a `RwLock`) so `broadcast` never blocks a concurrent
//! connect/disconnect, per §5. Each client owns a bounded `mpsc` channel;
//! its queued-but-unsent byte count IS the client's `buffered_bytes`
//! counter. The connection task that actually writes to the socket is the
//! one true suspension point (with the §5 2s write timeout) — `broadcast`
//! only ever does a non-blocking `try_send`, treating a full channel the
//! same as a broken client (removed, never propagated). This keeps one
//! slow client from ever stalling the fan-out to the rest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::wire::Priority;

pub const PAUSE_HIGH_BYTES: usize = 64 * 1024;
pub const RESUME_LOW_BYTES: usize = 16 * 1024;
const CLIENT_QUEUE_DEPTH: usize = 256;

/// A connected client's lifecycle state, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// A single queued frame: priority decides whether hysteresis may drop it;
/// `len` is what `buffered_bytes` is charged for it.
pub(crate) struct Frame {
    #[allow(dead_code)] // retained for future per-priority client diagnostics
    pub(crate) priority: Priority,
    pub(crate) len: usize,
    pub(crate) payload: Arc<str>,
}

struct ClientState {
    ready_state: RwLock<ReadyState>,
    buffered_bytes: AtomicUsize,
    paused: AtomicBool,
    dropped_high: AtomicU64,
    dropped_normal: AtomicU64,
    dropped_low: AtomicU64,
    sender: mpsc::Sender<Frame>,
}

impl ClientState {
    /// Hysteresis per §4.8: pause above `PAUSE_HIGH_BYTES`, resume at or
    /// below `RESUME_LOW_BYTES`; the band between them holds whatever the
    /// prior state was.
    fn recompute_paused(&self, pause_high: usize, resume_low: usize) -> bool {
        let buffered = self.buffered_bytes.load(Ordering::Acquire);
        let was_paused = self.paused.load(Ordering::Acquire);
        let now_paused = if !was_paused && buffered >= pause_high {
            true
        } else if was_paused && buffered <= resume_low {
            false
        } else {
            was_paused
        };
        self.paused.store(now_paused, Ordering::Release);
        now_paused
    }

    fn record_drop(&self, priority: Priority) {
        match priority {
            Priority::High => self.dropped_high.fetch_add(1, Ordering::Relaxed),
            Priority::Normal => self.dropped_normal.fetch_add(1, Ordering::Relaxed),
            Priority::Low => self.dropped_low.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Handle given to a client's connection task: lets it observe the actual
/// write outcome (decrementing `buffered_bytes`) and update `ready_state`.
pub struct ClientHandle {
    id: String,
    state: Arc<ClientState>,
    fabric: BroadcastFabric,
    receiver: RwLock<Option<mpsc::Receiver<Frame>>>,
}

impl ClientHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Take the receiving half — the connection task pulls frames (already
    /// serialized JSON) to write to the socket. May only be called once.
    pub async fn take_receiver(&self) -> Option<mpsc::Receiver<Frame>> {
        self.receiver.write().await.take()
    }

    /// Current `ready_state`.
    pub async fn ready_state(&self) -> ReadyState {
        *self.state.ready_state.read().await
    }

    pub async fn set_ready_state(&self, state: ReadyState) {
        *self.state.ready_state.write().await = state;
    }

    /// Record that `len` bytes were successfully flushed to the socket.
    pub fn note_sent(&self, len: usize) {
        self.state.buffered_bytes.fetch_sub(len, Ordering::AcqRel);
    }

    /// The client's current buffered-byte count.
    pub fn buffered_bytes(&self) -> usize {
        self.state.buffered_bytes.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::Acquire)
    }

    /// Remove this client from the fabric. Idempotent.
    pub async fn disconnect(&self) {
        self.set_ready_state(ReadyState::Closed).await;
        self.fabric.remove(&self.id).await;
    }
}

/// C8. Holds every connected client and fans messages out to them.
#[derive(Clone)]
pub struct BroadcastFabric {
    clients: Arc<RwLock<HashMap<String, Arc<ClientState>>>>,
    pause_high: usize,
    resume_low: usize,
}

impl BroadcastFabric {
    pub fn new() -> Self {
        Self::with_thresholds(PAUSE_HIGH_BYTES, RESUME_LOW_BYTES)
    }

    pub fn with_thresholds(pause_high: usize, resume_low: usize) -> Self {
        Self { clients: Arc::new(RwLock::new(HashMap::new())), pause_high, resume_low }
    }

    /// Register a new client, returning the handle the ws layer uses to
    /// drive its connection task.
    pub async fn register(&self, client_id: String) -> Arc<ClientHandle> {
        let (sender, receiver) = mpsc::channel(CLIENT_QUEUE_DEPTH);
        let state = Arc::new(ClientState {
            ready_state: RwLock::new(ReadyState::Open),
            buffered_bytes: AtomicUsize::new(0),
            paused: AtomicBool::new(false),
            dropped_high: AtomicU64::new(0),
            dropped_normal: AtomicU64::new(0),
            dropped_low: AtomicU64::new(0),
            sender,
        });
        self.clients.write().await.insert(client_id.clone(), state.clone());
        Arc::new(ClientHandle {
            id: client_id,
            state,
            fabric: self.clone(),
            receiver: RwLock::new(Some(receiver)),
        })
    }

    pub async fn remove(&self, client_id: &str) {
        self.clients.write().await.remove(client_id);
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Deliver `payload` (already serialized) at `priority` to every
    /// connected client, per the six-step delivery rule in §4.8.
    pub async fn broadcast(&self, priority: Priority, payload: &str) {
        let len = payload.len();
        let shared: Arc<str> = Arc::from(payload);
        // Copy-on-write snapshot: broadcast never blocks a concurrent
        // connect/disconnect, per §5.
        let clients: Vec<Arc<ClientState>> = self.clients.read().await.values().cloned().collect();

        for client in clients {
            if *client.ready_state.read().await != ReadyState::Open {
                continue; // step 1: skip silently
            }
            let paused = client.recompute_paused(self.pause_high, self.resume_low); // step 2

            let should_send = match priority {
                Priority::High => true, // step 3
                _ if paused => {
                    client.record_drop(priority); // step 4
                    false
                }
                _ => true, // step 5
            };
            if !should_send {
                continue;
            }

            let frame = Frame { priority, len, payload: shared.clone() };
            client.buffered_bytes.fetch_add(len, Ordering::AcqRel);
            if client.sender.try_send(frame).is_err() {
                // step 6: treat a saturated/closed channel as a broken
                // client — never propagate, just drop it from the registry.
                client.buffered_bytes.fetch_sub(len, Ordering::AcqRel);
                debug!("client send queue saturated, dropping client");
                // Removal happens lazily: the client isn't addressable by
                // id from this snapshot, so mark it closed; its own
                // connection task will notice the channel is gone and
                // deregister via `disconnect`.
                *client.ready_state.write().await = ReadyState::Closed;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn thresholds(&self) -> (usize, usize) {
        (self.pause_high, self.resume_low)
    }
}

impl Default for BroadcastFabric {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
