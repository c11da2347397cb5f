//! Gateway protocol schema
//!
//! Defines the wire format for gateway messages.
//!
//! ```text
//! request   {"id": "7", "type": "sessions.list", "payload": {}}
//! response  {"id": "7", "status": "ok", "payload": [...]}
//!           {"id": "7", "status": "error", "payload": {"code": -32003, "message": "..."}}
//! event     {"type": "event", "event": "session.updated", "payload": {...}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Request frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFrame {
    /// Correlation ID, echoed back by the gateway
    pub id: String,
    /// Method name
    #[serde(rename = "type")]
    pub method: String,
    /// Parameters
    #[serde(default)]
    pub payload: Value,
}

impl RequestFrame {
    /// Create a new request
    pub fn new(id: impl Into<String>, method: impl Into<String>, payload: Value) -> Self {
        RequestFrame {
            id: id.into(),
            method: method.into(),
            payload,
        }
    }
}

/// Response outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// Success; payload is the result
    Ok,
    /// Failure; payload describes the error
    Error,
}

/// Response frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFrame {
    /// Request ID this responds to
    pub id: String,
    /// Outcome
    pub status: ResponseStatus,
    /// Result or error details
    #[serde(default)]
    pub payload: Value,
}

impl ResponseFrame {
    /// Create a success response
    pub fn ok(id: impl Into<String>, payload: Value) -> Self {
        ResponseFrame {
            id: id.into(),
            status: ResponseStatus::Ok,
            payload,
        }
    }

    /// Create an error response
    pub fn error(id: impl Into<String>, error: ProtocolError) -> Self {
        ResponseFrame {
            id: id.into(),
            status: ResponseStatus::Error,
            payload: serde_json::to_value(error).unwrap_or(Value::Null),
        }
    }
}

/// Event frame pushed by the gateway without a request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrame {
    /// Event name
    pub event: String,
    /// Event data
    #[serde(default)]
    pub payload: Value,
}

/// Anything the gateway may send us
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// Reply to one of our requests
    Response(ResponseFrame),
    /// Unsolicited event
    Event(EventFrame),
}

impl InboundFrame {
    /// Decode a text frame.
    ///
    /// Frames carrying an `id` are responses. Frames without one must be
    /// `{"type": "event", ...}`.
    pub fn parse(text: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;

        if value.get("id").is_some() {
            return serde_json::from_value(value)
                .map(InboundFrame::Response)
                .map_err(|e| e.to_string());
        }

        match value.get("type").and_then(Value::as_str) {
            Some("event") => serde_json::from_value(value)
                .map(InboundFrame::Event)
                .map_err(|e| e.to_string()),
            Some(other) => Err(format!("unexpected frame type '{}'", other)),
            None => Err("frame has neither id nor type".to_string()),
        }
    }
}

/// Protocol error
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Standard error codes
pub mod error_codes {
    /// Method not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Session not found
    pub const SESSION_NOT_FOUND: i32 = -32003;
}

impl ProtocolError {
    /// Create a new protocol error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        ProtocolError {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    /// Create a session-not-found error
    pub fn session_not_found(session_id: &str) -> Self {
        Self::new(
            error_codes::SESSION_NOT_FOUND,
            format!("Session not found: {}", session_id),
        )
    }

    /// Interpret an error payload.
    ///
    /// Payloads that are not `{code, message}` objects are kept as the
    /// message of an internal error.
    pub fn from_payload(payload: Value) -> Self {
        match serde_json::from_value::<ProtocolError>(payload.clone()) {
            Ok(err) => err,
            Err(_) => match payload {
                Value::String(message) => Self::internal(message),
                other => Self::internal(other.to_string()),
            },
        }
    }
}
