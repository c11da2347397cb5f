//! Gateway client
//!
//! Session-level API on top of the connection. Calls require an
//! established connection; nothing here connects on demand.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::connection::{Connection, ConnectionState};
use super::protocol::{
    decode_history, decode_sessions, methods, HistoryEntry, Session, SessionsHistoryRequest,
    SessionsListRequest,
};
use super::transport::{Connector, WsConnector};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};

/// Client for the OpenClaw Gateway
pub struct GatewayClient {
    connection: Connection,
    request_timeout: Duration,
}

impl GatewayClient {
    /// Create a disconnected client using the WebSocket transport
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Create a disconnected client over an arbitrary transport
    pub fn with_connector(config: &GatewayConfig, connector: Arc<dyn Connector>) -> Self {
        GatewayClient {
            connection: Connection::new(config.url.clone(), config.connect_timeout, connector),
            request_timeout: config.request_timeout,
        }
    }

    /// Gateway address this client talks to
    pub fn gateway_url(&self) -> &str {
        self.connection.url()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Message of the last failed connect, if the client is in `Failed`
    pub fn last_error(&self) -> Option<String> {
        self.connection.last_error()
    }

    /// Requests currently awaiting a reply
    pub fn pending_requests(&self) -> usize {
        self.connection.pending_requests()
    }

    /// Connect, joining any attempt already in flight
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    pub async fn disconnect(&self) {
        self.connection.disconnect().await
    }

    /// List the sessions the gateway knows about
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        let payload = serde_json::to_value(SessionsListRequest::default())?;
        let reply = self
            .connection
            .call(methods::SESSIONS_LIST, payload, self.request_timeout)
            .await?;

        let sessions = decode_sessions(reply)?;
        debug!(count = sessions.len(), "Listed gateway sessions");
        Ok(sessions)
    }

    /// Fetch one session's conversation history, oldest first
    pub async fn get_session_history(&self, session_id: &str) -> Result<Vec<HistoryEntry>> {
        if session_id.trim().is_empty() {
            return Err(Error::InvalidInput("session id must not be empty".to_string()));
        }

        let payload = serde_json::to_value(SessionsHistoryRequest {
            session_id: session_id.to_string(),
        })?;
        let reply = self
            .connection
            .call(methods::SESSIONS_HISTORY, payload, self.request_timeout)
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound(format!("session {}", session_id)),
                other => other,
            })?;

        let history = decode_history(reply)?;
        debug!(session_id = %session_id, entries = history.len(), "Fetched session history");
        Ok(history)
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("url", &self.gateway_url())
            .field("state", &self.state())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
