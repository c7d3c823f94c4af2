// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Paneboard: observes multiple concurrent AI coding-assistant sessions
//! running inside a terminal multiplexer, reconciles their state from
//! hook callbacks, terminal-content parsing, and explicit commands, and
//! streams live updates to many browser clients over WebSocket.
//!
//! This crate wires the domain logic in [`paneboard_core`] to a
//! transport: axum for HTTP/WebSocket, sqlx/SQLite for persistence, and a
//! host-specific [`adapter::MuxAdapter`] for the terminal multiplexer
//! itself. [`run`] spawns one long-lived task per §5 concurrency unit —
//! poller, reconciler, fanout, persistence, retention sweeper — and
//! serves the HTTP/WebSocket router until its [`CancellationToken`] fires.

pub mod adapter;
pub mod auth;
pub mod broadcast;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod fanout;
pub mod hooks;
pub mod linking;
pub mod persistence;
pub mod poller;
pub mod reconciler;
pub mod retention;
pub mod state;
pub mod wire;
pub mod ws;

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use paneboard_core::bus::EventBus;
use paneboard_core::parser::ParserOptions;
use paneboard_core::pattern::PatternRegistry;
use paneboard_core::session::SessionRegistry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapter::{MuxAdapter, TmuxAdapter};
use crate::broadcast::BroadcastFabric;
use crate::commands::CommandRouter;
use crate::config::Config;
use crate::db::Db;
use crate::linking::Linker;
use crate::reconciler::{EventBusSink, Reconciler, ReconcilerConfig};
use crate::state::AppState;

/// Build the axum router. Split out from [`run`] so integration tests can
/// mount it against an [`AppState`] built with a [`adapter::MockAdapter`]
/// without binding a real socket.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/hook", post(hooks::hook))
        .route("/ws", get(ws::ws_handler))
        .route("/healthz", get(healthz))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz(axum::extract::State(state): axum::extract::State<Arc<AppState>>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "ok": true,
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "clients": state.fabric.client_count().await,
        "sessions": state.registry.len().await,
    }))
}

/// Construct every long-lived component and wire it together, without
/// spawning background tasks or binding a socket. Shared by [`run`] and
/// by tests that want a fully wired [`AppState`].
pub async fn build_state(config: Config, adapter: Arc<dyn MuxAdapter>) -> anyhow::Result<Arc<AppState>> {
    config.validate()?;

    let db = Arc::new(Db::connect(&config.db_path).await?);
    let registry = Arc::new(SessionRegistry::new());
    let patterns = Arc::new(PatternRegistry::new());
    let bus = EventBus::new();
    let fabric = BroadcastFabric::with_thresholds(config.pause_high_bytes, config.resume_low_bytes);
    let linker = Arc::new(Linker::new(db.clone(), registry.clone()));

    let sink: Arc<dyn reconciler::StatusSink> = Arc::new(EventBusSink(bus.clone()));
    let reconciler_config = ReconcilerConfig {
        hook_precedence: config.hook_precedence(),
        min_hold: config.min_hold(),
        coalesce_window: config.coalesce_window(),
        idle_grace: config.idle_grace(),
        parser_options: ParserOptions { tail_lines: config.capture_lines, ..ParserOptions::default() },
    };
    let reconciler = Arc::new(Reconciler::new(registry.clone(), patterns.clone(), sink, linker.clone(), reconciler_config));

    let commands = Arc::new(CommandRouter::new(
        adapter.clone(),
        reconciler.clone(),
        bus.clone(),
        config.capture_lines,
        config.max_panes_per_group,
    ));

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        registry,
        patterns,
        bus,
        reconciler,
        fabric,
        db,
        linker,
        adapter,
        commands,
        started_at: Instant::now(),
    }))
}

/// Spawn every background task named in §5: one poller, one reconciler
/// (multiplexing bus inputs), one fanout subscriber, one persistence
/// subscriber, one retention sweeper. Each honours `cancel`.
pub fn spawn_background_tasks(state: Arc<AppState>, cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    handles.push(poller::spawn(
        state.adapter.clone(),
        state.bus.clone(),
        state.config.capture_lines,
        state.config.poll_interval(),
        cancel.clone(),
    ));

    handles.push(tokio::spawn({
        let reconciler = state.reconciler.clone();
        let bus = state.bus.clone();
        let cancel = cancel.clone();
        async move { reconciler.run(bus, cancel).await }
    }));

    handles.push(fanout::spawn(state.bus.clone(), state.registry.clone(), state.fabric.clone(), cancel.clone()));

    handles.push(persistence::spawn(state.db.clone(), state.registry.clone(), state.bus.clone(), cancel.clone()));

    handles.push(retention::spawn(
        state.db.clone(),
        state.config.retention_window(),
        retention::DEFAULT_SWEEP_INTERVAL,
        cancel.clone(),
    ));

    handles
}

/// Run the server until `shutdown` fires: build state, spawn every
/// background task, and serve the HTTP/WebSocket router.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let adapter: Arc<dyn MuxAdapter> = Arc::new(TmuxAdapter::new());
    let state = build_state(config, adapter).await?;

    let _tasks = spawn_background_tasks(state.clone(), shutdown.clone());

    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "paneboard listening");
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
