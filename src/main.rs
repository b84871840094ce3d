//! OriNotes - a web front end for browsing, sharing and viewing course notes.
//!
//! This is the main entry point for the web server.
//! The application is organized into the following modules:
//!
//! - `api`: HTTP client for the notes backend
//! - `auth`: Signed session cookies and the in-memory session store
//! - `filters` / `catalog`: Cascading filter levels and their option tables
//! - `search` / `live_search`: Debounced search and its WebSocket transport
//! - `access`: Who may open which note
//! - `thumbnail`: First-page PDF previews
//! - `browse`, `upload`, `password_reset`, `handlers`: HTTP route handlers
//! - `templates`: HTML/CSS/JS templates and rendering

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use orinotes::{config::Config, router, AppState};

/// How often expired sessions and reset flows are dropped.
const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orinotes=info")),
        )
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let state = match AppState::new(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to build backend client: {}", e);
            std::process::exit(1);
        }
    };

    let purge_state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let sessions = purge_state.sessions.purge_expired().await;
            let flows = purge_state.reset_flows.purge_expired().await;
            if sessions + flows > 0 {
                info!(sessions, flows, "purged expired state");
            }
        }
    });

    let bind = state.config.bind.clone();
    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", bind, e);
            std::process::exit(1);
        }
    };

    info!("OriNotes running at http://{}", bind);
    info!("Backend: {}", state.config.backend_url);

    if let Err(e) = axum::serve(listener, router(state)).await {
        error!("Server error: {}", e);
    }
}
