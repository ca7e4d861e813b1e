// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! form2mail service binary.
//!
//! Wires the tracker, mailer, and HTTP surface together:
//!
//! 1. Load configuration (`config.toml` + `FORM2MAIL__*` env vars)
//! 2. Spawn the cancellable purge task
//! 3. Serve until ctrl-c, then signal the purge task and drain

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use form2mail::{
    config::Config,
    handlers::{router, AppState},
    mailer::SmtpMailer,
    tracker::RateTracker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::load()?;
    info!(
        bind_addr = %config.bind_addr,
        site_name = %config.site_name,
        recipients = config.recipients.len(),
        max_per_hour = config.rate_limit.max_per_hour,
        window_secs = config.rate_limit.window_secs,
        purge_interval_secs = config.rate_limit.purge_interval_secs,
        "Starting form2mail relay"
    );

    // Create application state
    let tracker = Arc::new(RateTracker::new(&config.rate_limit));
    let mailer = SmtpMailer::new(config.smtp.clone());

    let state = Arc::new(AppState {
        tracker: tracker.clone(),
        mailer,
        config: config.clone(),
    });

    // Spawn the purge task with a shutdown handle
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let purge_task = tokio::spawn(async move { tracker.run_purge(shutdown_rx).await });

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Stop the purge loop deterministically before exiting
    let _ = shutdown_tx.send(true);
    purge_task.await?;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
