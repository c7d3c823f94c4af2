// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;

use paneboard_server::config::Config;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("{}", config.log_level)));
    if config.log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_signal.cancel();
        }
    });

    if let Err(e) = paneboard_server::run(config, shutdown).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
