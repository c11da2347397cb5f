//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::Error;
use crate::files::FileError;

/// Error returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    /// Gateway client failure
    Gateway(Error),
    /// File access failure
    File(FileError),
}

impl ApiError {
    /// Status code for this error.
    ///
    /// Gateway-link failures are 503; everything else from the client is 500.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Gateway(e) if e.is_connection_error() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::File(e) => match e {
                FileError::MissingPath | FileError::InvalidRelativePath | FileError::IsDirectory(_) => {
                    StatusCode::BAD_REQUEST
                }
                FileError::NotFound => StatusCode::NOT_FOUND,
                FileError::AccessDenied => StatusCode::FORBIDDEN,
                FileError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

/// Public message for a gateway client error; internal details stay in the logs
fn gateway_message(err: &Error) -> &'static str {
    match err {
        Error::ConnectFailed(_) => "Failed to connect to OpenClaw Gateway",
        Error::NotConnected => "Not connected to OpenClaw Gateway",
        Error::ConnectionLost(_) | Error::TransportClosed(_) => "Lost connection to OpenClaw Gateway",
        Error::RequestTimeout(_) => "OpenClaw Gateway request timed out",
        Error::NotFound(_) => "Session not found",
        Error::InvalidInput(_) => "Invalid session id",
        Error::Gateway { .. } => "OpenClaw Gateway returned an error",
        Error::Protocol(_) => "Unexpected reply from OpenClaw Gateway",
        _ => "Internal server error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Gateway(e) => json!({ "error": gateway_message(e), "kind": e.kind() }),
            ApiError::File(FileError::IsDirectory(path)) => json!({
                "error": FileError::IsDirectory(path.clone()).to_string(),
                "path": path.display().to_string(),
            }),
            ApiError::File(FileError::Io(_)) => json!({ "error": "Internal server error" }),
            ApiError::File(e) => json!({ "error": e.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Gateway(err)
    }
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        ApiError::File(err)
    }
}
