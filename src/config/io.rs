//! Configuration I/O - Loading configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use super::types::files::expand_home;
use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (config.json / config.json5 / config.toml) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config)?;

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    parse_config(path, &content)
}

fn parse_config(path: &Path, content: &str) -> Result<Config> {
    // Detect format by extension
    let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
        json5::from_str(content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        json5::from_str(content)
            .or_else(|_| toml::from_str(content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, then overlays any set variables. Env vars have the
/// highest precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    dotenvy::dotenv().ok();
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Overlay values produced by `lookup` onto `config`.
///
/// Split out from [`apply_env_overrides`] so the mapping can be exercised
/// without touching the process environment.
pub(crate) fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    // Gateway
    if let Some(url) = lookup("OPENCLAW_GATEWAY_URL") {
        config.gateway.url = url;
    }
    if let Some(raw) = lookup("OPENCLAW_REQUEST_TIMEOUT") {
        config.gateway.request_timeout = parse_duration("OPENCLAW_REQUEST_TIMEOUT", &raw)?;
    }
    if let Some(raw) = lookup("OPENCLAW_CONNECT_TIMEOUT") {
        config.gateway.connect_timeout = parse_duration("OPENCLAW_CONNECT_TIMEOUT", &raw)?;
    }

    // Auth
    if let Some(token) = lookup("MC_API_TOKEN") {
        config.auth.api_token = if token.is_empty() {
            None
        } else {
            Some(SecretString::from(token))
        };
    }

    // Files
    if let Some(path) = lookup("PROJECTS_PATH") {
        config.files.projects_path = expand_home(&path);
    }

    // Server
    if let Some(bind) = lookup("MC_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = lookup("MC_PORT") {
        config.server.port = port
            .parse()
            .map_err(|_| Error::Config(format!("Invalid MC_PORT: {}", port)))?;
    }

    // Logging
    if let Some(level) = lookup("RUST_LOG") {
        config.log.level = level;
    }
    if let Some(format) = lookup("LOG_FORMAT") {
        config.log.format = format;
    }

    Ok(())
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration> {
    humantime::parse_duration(raw)
        .map_err(|e| Error::Config(format!("Invalid {}: {} ({})", key, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_overrides_from(
            &mut config,
            lookup(&[
                ("OPENCLAW_GATEWAY_URL", "ws://10.0.0.2:18789"),
                ("OPENCLAW_REQUEST_TIMEOUT", "750ms"),
                ("MC_API_TOKEN", "tok"),
                ("PROJECTS_PATH", "/srv/projects"),
                ("MC_PORT", "8080"),
            ]),
        )
        .unwrap();

        assert_eq!(config.gateway.url, "ws://10.0.0.2:18789");
        assert_eq!(config.gateway.request_timeout, Duration::from_millis(750));
        assert_eq!(
            config.auth.api_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("tok".to_string())
        );
        assert_eq!(config.files.projects_path, std::path::PathBuf::from("/srv/projects"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_empty_token_disables_auth() {
        let mut config = Config::default();
        apply_overrides_from(&mut config, lookup(&[("MC_API_TOKEN", "")])).unwrap();
        assert!(config.auth.api_token.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        assert!(apply_overrides_from(&mut config, lookup(&[("MC_PORT", "http")])).is_err());
        assert!(
            apply_overrides_from(&mut config, lookup(&[("OPENCLAW_REQUEST_TIMEOUT", "soon")]))
                .is_err()
        );
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[gateway]\nurl = \"wss://gw.example.com\"\n\n[server]\nport = 4000"
        )
        .unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.gateway.url, "wss://gw.example.com");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config_from_path(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
