//! # vibesync-server
//!
//! HTTP API for VibeSync.
//!
//! This binary provides:
//! - **Vibe profiles** and 1:1 matching by vibe similarity
//! - **Pairwise chats** that lock after 24h unless both users follow each other
//! - **Chat rooms** of four, formed from compatible, energy-diverse users
//! - **Group plans** with creation quotas, discovery and conversion voting
//! - **Whisper wall** of anonymous, short-lived posts
//! - **Sweep endpoints** that an external scheduler calls to expire entities

mod api;
mod auth;
mod config;
mod error;
mod text_service;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use vibesync_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::text_service::{DisabledTextGenerator, HttpTextGenerator, TextGenerator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vibesync_server=debug")),
        )
        .init();

    info!("Starting VibeSync server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        addr = %config.http_addr,
        admin_enabled = config.admin_token.is_some(),
        sweeps_guarded = config.internal_api_key.is_some(),
        text_service = config.text_service_url.is_some(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the database (runs pending migrations)
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::open_default()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database ready");
    }

    // -----------------------------------------------------------------------
    // 4. Text-generation client
    // -----------------------------------------------------------------------
    let text: Arc<dyn TextGenerator> = match &config.text_service_url {
        Some(url) => Arc::new(HttpTextGenerator::new(url.clone(), config.text_service_timeout)?),
        None => {
            info!("No TEXT_SERVICE_URL set, advisory text features use canned fallbacks");
            Arc::new(DisabledTextGenerator)
        }
    };

    let http_addr = config.http_addr;
    let app_state = AppState::new(db, config, text);

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
