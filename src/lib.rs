//! OriNotes web front end - re-exports for testing and external use.
//!
//! This module provides public access to all the application's modules
//! and builds the router `main` serves.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

pub mod access;
pub mod api;
pub mod auth;
pub mod browse;
pub mod catalog;
pub mod config;
pub mod error;
pub mod favourites;
pub mod filters;
pub mod handlers;
pub mod live_search;
pub mod models;
pub mod password_reset;
pub mod search;
pub mod templates;
pub mod thumbnail;
pub mod upload;

use api::ApiClient;
use auth::SessionStore;
use config::Config;
use error::ApiError;
use password_reset::ResetFlowStore;

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub config: Config,
    pub api: ApiClient,
    pub sessions: SessionStore,
    pub reset_flows: ResetFlowStore,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let api = ApiClient::new(config.backend_url.clone(), config.request_timeout)?;
        Ok(Self::with_api(config, api))
    }

    pub fn with_api(config: Config, api: ApiClient) -> Self {
        Self {
            sessions: SessionStore::new(config.session_secret.clone()),
            reset_flows: ResetFlowStore::default(),
            config,
            api,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Core routes
        .route("/", get(handlers::home))
        .route("/login", get(handlers::login_page).post(handlers::login_submit))
        .route("/register", get(handlers::register_page).post(handlers::register_submit))
        .route("/logout", get(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        // Password reset
        .route(
            "/forgot-password",
            get(password_reset::forgot_password_page).post(password_reset::request_code),
        )
        .route("/forgot-password/verify", post(password_reset::verify_code))
        .route("/forgot-password/reset", post(password_reset::reset_password))
        // Browsing
        .route("/notes", get(browse::notes_page))
        .route("/notes/{id}/view", get(handlers::view_note))
        .route("/my-notes", get(handlers::my_notes))
        .route("/ws/search", get(live_search::ws_handler))
        // Upload
        .route(
            "/upload",
            get(upload::upload_page)
                .post(upload::upload_submit)
                .layer(DefaultBodyLimit::max(upload::MAX_UPLOAD_BYTES)),
        )
        // Script endpoints
        .route("/api/notes/{id}", delete(handlers::delete_note))
        .route("/api/favourites/{id}", post(handlers::toggle_favourite))
        .with_state(state)
}

pub use access::{can_view, evaluate, AccessDecision, FREE_VIEW_LIMIT};
pub use filters::{FilterLevel, FilterSelection, Hierarchy, MaterialType};
pub use search::{DebouncedSearch, SearchUpdate};
pub use thumbnail::generate_thumbnail;
