//! # vor-server - Voice Recording Ingestion Server
//!
//! Receives callbacks from a telephony flow that recorded a caller's answers as separate
//! WAV files, stitches the answers into one recording, and stores it under an anonymized
//! name.
//!
//! ## Application Architecture:
//! - **config**: Server configuration (TOML file + environment variables)
//! - **anonymize**: Salted digest of the caller's number used as the recording name
//! - **audio**: WAV decoding, format validation and merging, WAV encoding
//! - **fetch**: Concurrent download of all segments of a callback
//! - **storage**: Local folder and S3 backends with a startup self-test
//! - **pipeline**: The request-level orchestration of all of the above
//! - **handlers / health**: HTTP endpoints
//! - **state / error**: Shared state and the error-to-status mapping
//!
//! ## Startup:
//! The server refuses to start unless the salt is long enough, the storage backend passes
//! its write/delete self-test, and the bind address is available.

mod anonymize;  // Recording name derivation (anonymize.rs)
mod audio;      // PCM decode/merge/encode (audio/ directory)
mod config;     // Configuration management (config.rs)
mod error;      // Error types and HTTP mapping (error.rs)
mod fetch;      // Segment downloads (fetch.rs)
mod handlers;   // HTTP request handlers (handlers/ directory)
mod health;     // Health endpoint (health.rs)
mod pipeline;   // Ingestion orchestration (pipeline.rs)
mod state;      // Shared application state (state.rs)
mod storage;    // Storage backends (storage/ directory)
#[cfg(test)]
mod testing;    // Test doubles

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::anonymize::Salt;
use crate::config::AppConfig;
use crate::fetch::HttpSegmentSource;
use crate::pipeline::Coordinator;
use crate::state::AppState;

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging**
/// 3. **Prepares the salt**, generating one if none was configured
/// 4. **Opens the storage backend**, which runs its self-test
/// 5. **Starts the HTTP server** and waits for it or a shutdown signal
///
/// Any failure before the server is bound ends the process with an error, so a broken
/// deployment never accepts a callback.
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::load().context("loading configuration")?;
    config.validate().context("invalid configuration")?;

    info!("Starting vor-server v{}", env!("CARGO_PKG_VERSION"));

    let salt = match &config.anonymizer.salt {
        Some(value) => Salt::new(value.as_str()).context("configured salt rejected")?,
        None => {
            warn!("No salt configured; generated a random one, names will not match across restarts");
            Salt::generate()
        }
    };

    let spec = config.storage_spec()?;
    let storage = storage::open_storage(&spec)
        .await
        .with_context(|| format!("storage {} is not usable", config.storage.target))?;
    info!(kind = storage.kind(), "Storage ready");

    let source = HttpSegmentSource::new(&config.fetch).context("building HTTP client")?;
    let coordinator = Coordinator::new(Arc::new(source), storage, salt);
    let app_state = web::Data::new(AppState::new(coordinator));

    let bind_addr = config.bind_addr();
    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("binding {}", bind_addr))?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Whichever finishes first: the server (usually an error) or a shutdown signal
    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        signal = wait_for_shutdown() => {
            signal.context("installing signal handlers")?;
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g. "debug", "vor_server=trace")
/// - If not set, defaults to "vor_server=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vor_server=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

/// Resolve once SIGTERM or SIGINT arrives.
///
/// In-flight callbacks are allowed to finish: `stop(true)` waits for running requests
/// before the workers exit.
async fn wait_for_shutdown() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
    Ok(())
}
