//! Process-wide client accessor
//!
//! The server builds one registry at startup and shares it through the
//! router state. The client inside is constructed lazily, exactly once,
//! and is never connected by the registry itself.

use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::client::GatewayClient;
use super::transport::{Connector, WsConnector};
use crate::config::GatewayConfig;

/// Lazily constructed, shared [`GatewayClient`]
pub struct ClientRegistry {
    config: GatewayConfig,
    connector: Arc<dyn Connector>,
    client: OnceLock<Arc<GatewayClient>>,
}

impl ClientRegistry {
    /// Registry whose client uses the WebSocket transport
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Registry whose client uses `connector`
    pub fn with_connector(config: GatewayConfig, connector: Arc<dyn Connector>) -> Self {
        ClientRegistry {
            config,
            connector,
            client: OnceLock::new(),
        }
    }

    /// The shared client, built on first use.
    ///
    /// Concurrent first calls block on a single construction and all
    /// receive the same instance.
    pub fn get_client(&self) -> Arc<GatewayClient> {
        let client = self.client.get_or_init(|| {
            debug!(url = %self.config.url, "Creating OpenClaw Gateway client");
            Arc::new(GatewayClient::with_connector(
                &self.config,
                Arc::clone(&self.connector),
            ))
        });
        Arc::clone(client)
    }

    /// Gateway address the client is (or will be) bound to
    pub fn gateway_url(&self) -> &str {
        &self.config.url
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("gateway_url", &self.config.url)
            .field("initialized", &self.client.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::MockConnector;

    #[test]
    fn test_concurrent_first_calls_share_one_client() {
        let registry = Arc::new(ClientRegistry::with_connector(
            GatewayConfig::default(),
            Arc::new(MockConnector::new()),
        ));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get_client())
            })
            .collect();
        let clients: Vec<Arc<GatewayClient>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        for client in &clients[1..] {
            assert!(Arc::ptr_eq(&clients[0], client));
        }
    }

    #[test]
    fn test_get_client_does_not_connect() {
        let connector = MockConnector::new();
        let registry =
            ClientRegistry::with_connector(GatewayConfig::default(), Arc::new(connector.clone()));

        let client = registry.get_client();
        assert!(!client.is_connected());
        assert_eq!(connector.open_count(), 0);
        assert_eq!(client.gateway_url(), registry.gateway_url());
    }
}
