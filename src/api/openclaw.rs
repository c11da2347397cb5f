//! OpenClaw Gateway endpoints

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, warn};

use super::error::ApiError;
use super::AppState;
use crate::error::Error;

/// GET /api/openclaw/status
///
/// Always 200; `connected` and `error` describe how far we got.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let client = state.registry.get_client();
    let gateway_url = client.gateway_url().to_string();

    if !client.is_connected() {
        if let Err(e) = client.connect().await {
            warn!(error = %e, "OpenClaw status check could not connect");
            return Json(json!({
                "connected": false,
                "error": "Failed to connect to OpenClaw Gateway",
                "gateway_url": gateway_url,
            }));
        }
    }

    match client.list_sessions().await {
        Ok(sessions) => Json(json!({
            "connected": true,
            "sessions_count": sessions.len(),
            "sessions": sessions,
            "gateway_url": gateway_url,
        })),
        Err(e) => {
            warn!(error = %e, "OpenClaw status check could not list sessions");
            Json(json!({
                "connected": true,
                "error": "Connected but failed to list sessions",
                "gateway_url": gateway_url,
            }))
        }
    }
}

/// GET /api/openclaw/sessions/{id}/history
pub async fn session_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let client = state.registry.get_client();

    if !client.is_connected() {
        client.connect().await.map_err(|e| {
            warn!(error = %e, "Could not connect to OpenClaw Gateway for history");
            // Whatever the cause, the caller sees a failed connect
            match e {
                Error::ConnectFailed(_) => e,
                other => Error::ConnectFailed(other.to_string()),
            }
        })?;
    }

    let history = client.get_session_history(&id).await.map_err(|e| {
        error!(session_id = %id, error = %e, "Failed to get OpenClaw session history");
        e
    })?;

    Ok(Json(json!({ "history": history })))
}
