//! HTTP control plane
//!
//! Routes:
//!
//! - `GET /health`
//! - `GET /api/openclaw/status`
//! - `GET /api/openclaw/sessions/{id}/history`
//! - `GET /api/files/download`
//!
//! Everything under `/api/` goes through [`auth::require_api_token`].

pub mod auth;
pub mod error;
pub mod files;
pub mod openclaw;

use axum::http::{header, HeaderValue};
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{AuthConfig, Config};
use crate::files::ProjectFiles;
use crate::gateway::ClientRegistry;

pub use error::ApiError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Owner of the process-wide gateway client
    pub registry: Arc<ClientRegistry>,
    /// Projects directory for downloads
    pub files: ProjectFiles,
    /// API token settings
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// State backed by the WebSocket gateway client
    pub fn new(config: &Config) -> Self {
        Self::with_registry(config, ClientRegistry::new(config.gateway.clone()))
    }

    /// State around an existing registry
    pub fn with_registry(config: &Config, registry: ClientRegistry) -> Self {
        AppState {
            registry: Arc::new(registry),
            files: ProjectFiles::new(config.files.projects_path.clone()),
            auth: Arc::new(config.auth.clone()),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/openclaw/status", get(openclaw::status))
        .route("/api/openclaw/sessions/{id}/history", get(openclaw::session_history))
        .route("/api/files/download", get(files::download))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_api_token))
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}
