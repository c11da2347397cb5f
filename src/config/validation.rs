//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_gateway_config(config, result);
    result = validate_auth_config(config, result);
    result = validate_files_config(config, result);

    result
}

fn validate_gateway_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    match url::Url::parse(&config.gateway.url) {
        Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
        Ok(url) => {
            result = result.with_error(
                ValidationIssue::new(
                    "gateway.url",
                    format!("Unsupported scheme '{}'", url.scheme()),
                )
                .with_suggestion("Use a ws:// or wss:// address, e.g. ws://127.0.0.1:18789"),
            );
        }
        Err(e) => {
            result = result.with_error(
                ValidationIssue::new("gateway.url", format!("Invalid URL: {}", e))
                    .with_suggestion("Set OPENCLAW_GATEWAY_URL"),
            );
        }
    }

    if config.gateway.request_timeout.is_zero() {
        result = result.with_error(ValidationIssue::new(
            "gateway.request_timeout",
            "Request timeout must be greater than zero",
        ));
    }
    if config.gateway.connect_timeout.is_zero() {
        result = result.with_error(ValidationIssue::new(
            "gateway.connect_timeout",
            "Connect timeout must be greater than zero",
        ));
    }

    result
}

fn validate_auth_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if !config.auth.is_enabled() {
        result = result.with_warning(
            ValidationIssue::new(
                "auth.api_token",
                "MC_API_TOKEN not set - API authentication is DISABLED (local dev mode)",
            )
            .with_suggestion("Set MC_API_TOKEN before exposing the service"),
        );
    }

    result
}

fn validate_files_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if !config.files.projects_path.is_dir() {
        result = result.with_warning(
            ValidationIssue::new(
                "files.projects_path",
                format!(
                    "Projects directory {} does not exist; file downloads will fail",
                    config.files.projects_path.display()
                ),
            )
            .with_suggestion("Set PROJECTS_PATH"),
        );
    }

    result
}
