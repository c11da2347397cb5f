//! File download endpoint

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::error::ApiError;
use super::AppState;
use crate::files::FileRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    path: Option<String>,
    relative_path: Option<String>,
    raw: Option<String>,
}

/// GET /api/files/download?path=...|relativePath=...[&raw=true]
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let request = FileRequest::from_query(query.path.as_deref(), query.relative_path.as_deref())?;
    let file = state.files.read(request).await?;

    if query.raw.as_deref() == Some("true") {
        let headers = [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_LENGTH, file.size().to_string()),
        ];
        return Ok((headers, file.bytes).into_response());
    }

    Ok(Json(file.to_download()).into_response())
}
