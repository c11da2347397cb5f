//! Gateway protocol types
//!
//! Request/response types for gateway methods.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Method names
pub mod methods {
    /// List sessions known to the gateway
    pub const SESSIONS_LIST: &str = "sessions.list";
    /// Fetch one session's conversation history
    pub const SESSIONS_HISTORY: &str = "sessions.history";
}

// ============================================================================
// Sessions
// ============================================================================

/// A gateway-reported session.
///
/// Only `id` is interpreted; everything else is relayed as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID
    pub id: String,
    /// Gateway-defined metadata
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// List sessions request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsListRequest {}

/// Session history request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsHistoryRequest {
    /// Session ID
    pub session_id: String,
}

/// One conversation record, relayed verbatim
pub type HistoryEntry = Value;

/// Decode a `sessions.list` payload: `[...]` or `{"sessions": [...]}`
pub fn decode_sessions(payload: Value) -> Result<Vec<Session>> {
    unwrap_list(payload, &["sessions"])?
        .into_iter()
        .map(|entry| {
            serde_json::from_value(entry)
                .map_err(|e| Error::Protocol(format!("Invalid session record: {}", e)))
        })
        .collect()
}

/// Decode a `sessions.history` payload: `[...]` or `{"history"|"messages": [...]}`
pub fn decode_history(payload: Value) -> Result<Vec<HistoryEntry>> {
    unwrap_list(payload, &["history", "messages"])
}

fn unwrap_list(payload: Value, keys: &[&str]) -> Result<Vec<Value>> {
    match payload {
        Value::Array(entries) => Ok(entries),
        Value::Object(mut map) => keys
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(entries)) => Some(entries),
                _ => None,
            })
            .ok_or_else(|| {
                Error::Protocol(format!("Expected an array under one of {:?}", keys))
            }),
        other => Err(Error::Protocol(format!(
            "Expected an array payload, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
