//! Error types for Mission Control

use thiserror::Error;

/// Result type alias using Mission Control's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Mission Control
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Gateway endpoint unreachable or handshake refused
    #[error("Failed to connect to gateway: {0}")]
    ConnectFailed(String),

    /// Send attempted on a transport that is no longer live
    #[error("Transport closed: {0}")]
    TransportClosed(String),

    /// Connection dropped while the request was in flight
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Facade call issued while the client is not connected
    #[error("Not connected to gateway")]
    NotConnected,

    /// No reply within the request bound
    #[error("Request timed out after {0:?}")]
    RequestTimeout(std::time::Duration),

    /// Gateway returned an explicit error payload
    #[error("Gateway error {code}: {message}")]
    Gateway {
        /// Gateway error code
        code: i32,
        /// Gateway error message
        message: String,
    },

    /// Reply could not be decoded into the expected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable identifier for the error kind, safe to expose over HTTP
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::ConnectFailed(_) => "connect_failed",
            Error::TransportClosed(_) => "transport_closed",
            Error::ConnectionLost(_) => "connection_lost",
            Error::NotConnected => "not_connected",
            Error::RequestTimeout(_) => "request_timeout",
            Error::Gateway { .. } => "gateway_error",
            Error::Protocol(_) => "protocol_error",
            Error::Json(_) => "json",
            Error::Io(_) => "io",
            Error::InvalidInput(_) => "invalid_argument",
            Error::NotFound(_) => "not_found",
            Error::Internal(_) => "internal",
        }
    }

    /// Check if the error means the gateway link is unusable
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectFailed(_)
                | Error::ConnectionLost(_)
                | Error::TransportClosed(_)
                | Error::NotConnected
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                Error::TransportClosed(err.to_string())
            }
            other => Error::ConnectionLost(other.to_string()),
        }
    }
}
