// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Shared application state handed to every axum handler via the `State`
//! extractor, grouped by concern the way the teacher's `transport::state`
//! groups its own `Store`.

use std::sync::Arc;
use std::time::Instant;

use paneboard_core::bus::EventBus;
use paneboard_core::pattern::PatternRegistry;
use paneboard_core::session::SessionRegistry;

use crate::adapter::MuxAdapter;
use crate::broadcast::BroadcastFabric;
use crate::commands::CommandRouter;
use crate::config::Config;
use crate::db::Db;
use crate::linking::Linker;
use crate::reconciler::Reconciler;

/// Everything a request handler might need: the domain state (registry,
/// patterns), the transport fan-out fabric, persistence, and the
/// multiplexer adapter for command pass-through.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
    pub patterns: Arc<PatternRegistry>,
    pub bus: EventBus,
    pub reconciler: Arc<Reconciler>,
    pub fabric: BroadcastFabric,
    pub db: Arc<Db>,
    pub linker: Arc<Linker>,
    pub adapter: Arc<dyn MuxAdapter>,
    /// Shared across every connection so its bounded-concurrency permit
    /// applies to the command surface as a whole, not per socket.
    pub commands: Arc<CommandRouter>,
    pub started_at: Instant,
}
