//! OpenClaw Gateway client
//!
//! Layered client for the external gateway process:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ ClientRegistry   one client per process      │
//! ├──────────────────────────────────────────────┤
//! │ GatewayClient    list_sessions / history     │
//! ├──────────────────────────────────────────────┤
//! │ Connection       state machine, epochs       │
//! ├──────────────────────────────────────────────┤
//! │ Correlator       id -> pending reply         │
//! ├──────────────────────────────────────────────┤
//! │ Transport        WebSocket text frames       │
//! └──────────────────────────────────────────────┘
//!                       │
//!                       ▼
//!            ws://127.0.0.1:18789
//! ```

pub mod client;
pub mod connection;
pub mod correlation;
pub mod protocol;
pub mod registry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::GatewayClient;
pub use connection::{Connection, ConnectionState};
pub use correlation::{Correlator, PendingCall};
pub use protocol::{
    error_codes, HistoryEntry, ProtocolError, RequestFrame, ResponseFrame, Session,
    PROTOCOL_VERSION,
};
pub use registry::ClientRegistry;
pub use transport::{Connector, Transport, WsConnector};
