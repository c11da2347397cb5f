//! Gateway Protocol - JSON envelopes over WebSocket
//!
//! ## Protocol Overview
//!
//! - **JSON text frames** over a single WebSocket
//! - **Request-response pattern** correlated by a client-chosen `id`
//! - **Events** may be pushed by the gateway at any time; they are ignored
//!
//! The schema is owned by the OpenClaw Gateway. Only `id`, `type`,
//! `status` and `payload` are interpreted here.

pub mod schema;
pub mod types;

pub use schema::{
    error_codes, EventFrame, InboundFrame, ProtocolError, RequestFrame, ResponseFrame,
    ResponseStatus, PROTOCOL_VERSION,
};
pub use types::*;
