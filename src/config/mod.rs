//! Configuration module
//!
//! - types/: configuration types (server, gateway, auth, files, log)
//! - io.rs: configuration loading with env overrides
//! - validation.rs: configuration validation
//! - paths.rs: config file lookup

mod io;
mod paths;
mod types;
mod validation;

pub use types::{Config, LogConfig, ServerConfig};
pub use types::auth::AuthConfig;
pub use types::files::{expand_home, FilesConfig};
pub use types::gateway::{GatewayConfig, DEFAULT_GATEWAY_URL};

pub use io::{apply_env_overrides, load_config, load_config_from_path};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
