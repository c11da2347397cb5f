//! API authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Bearer-token authentication for `/api/*`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared API token. `None` disables authentication (local dev mode).
    #[serde(skip_serializing, default)]
    pub api_token: Option<SecretString>,
}

impl AuthConfig {
    /// Whether requests must present a token
    pub fn is_enabled(&self) -> bool {
        self.api_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }

    /// Check a presented token against the configured one
    pub fn verify(&self, presented: &str) -> bool {
        match &self.api_token {
            Some(expected) => {
                let expected = expected.expose_secret();
                !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_token() {
        let auth = AuthConfig::default();
        assert!(!auth.is_enabled());
        assert!(auth.verify("anything"));
    }

    #[test]
    fn test_verify_token() {
        let auth = AuthConfig {
            api_token: Some(SecretString::from("s3cret")),
        };
        assert!(auth.is_enabled());
        assert!(auth.verify("s3cret"));
        assert!(!auth.verify("s3cre"));
        assert!(!auth.verify("wrong!"));
        assert!(!auth.verify("s3cret "));
        assert!(!auth.verify(""));
    }

    #[test]
    fn test_empty_token_rejects_everything() {
        let auth = AuthConfig {
            api_token: Some(SecretString::from("")),
        };
        assert!(!auth.is_enabled());
        assert!(!auth.verify(""));
        assert!(!auth.verify("anything"));
    }
}
