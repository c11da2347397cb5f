//! # Mission Control
//!
//! Control-plane service for OpenClaw agents.
//!
//! ## Features
//!
//! - **Gateway Client:** WebSocket client for the OpenClaw Gateway with
//!   single-flight connect and request/response correlation
//! - **Session Inspection:** list sessions and fetch conversation history
//! - **File Downloads:** serve project files to remote agents, confined to
//!   the projects directory
//! - **Token Auth:** optional bearer-token protection for `/api/*`

pub mod api;
pub mod config;
pub mod error;
pub mod files;
pub mod gateway;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
