//! Bearer-token authentication for `/api/*`

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::debug;

use super::AppState;

/// Path whose clients cannot set headers and may pass `?token=` instead
const EVENT_STREAM_PATH: &str = "/api/events/stream";

/// Reject `/api/*` requests without a valid token when auth is enabled
pub async fn require_api_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if !path.starts_with("/api/") || !state.auth.is_enabled() {
        return next.run(request).await;
    }

    if request.uri().path() == EVENT_STREAM_PATH {
        if let Some(token) = query_token(request.uri().query()) {
            if state.auth.verify(&token) {
                return next.run(request).await;
            }
        }
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| state.auth.verify(token));

    if authorized {
        next.run(request).await
    } else {
        debug!(path = %request.uri().path(), "Rejected unauthenticated API request");
        unauthorized()
    }
}

fn query_token(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
}
