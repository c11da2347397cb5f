//! WebSocket transport
//!
//! Opens one duplex connection to the gateway and exposes it as a pair of
//! text-frame halves. No knowledge of correlation or session semantics.

use async_trait::async_trait;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::debug;

use crate::error::{Error, Result};

/// Outbound half: accepts serialized JSON envelopes
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Inbound half: yields text frames until the connection closes
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A live duplex connection to the gateway.
///
/// The stream ending (or yielding an error) is the closure signal.
pub struct Transport {
    /// Send half
    pub sink: FrameSink,
    /// Receive half
    pub stream: FrameStream,
}

impl Transport {
    /// Build a transport from any sink/stream pair
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<String, Error = Error> + Send + 'static,
        R: Stream<Item = Result<String>> + Send + 'static,
    {
        Transport {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

/// Opens transports to a gateway address
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection, failing with `ConnectFailed` if the endpoint is
    /// unreachable or the handshake does not finish within `timeout`.
    async fn open(&self, url: &str, timeout: Duration) -> Result<Transport>;
}

/// Production connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str, timeout: Duration) -> Result<Transport> {
        debug!(url = %url, "Connecting to gateway WebSocket");

        let (ws, _) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| Error::ConnectFailed(format!("Handshake with {} timed out after {:?}", url, timeout)))?
            .map_err(|e| Error::ConnectFailed(format!("WebSocket connect to {} failed: {}", url, e)))?;

        let (sink, stream) = ws.split();

        let sink = sink
            .sink_map_err(Error::from)
            .with(|text: String| future::ok::<_, Error>(Message::Text(text)));

        // Ping/pong is answered by tungstenite; binary frames are not part of the protocol
        let stream = stream
            .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
            .filter_map(|msg| {
                future::ready(match msg {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(_) => None,
                    Err(e) => Some(Err(Error::from(e))),
                })
            });

        debug!(url = %url, "Gateway WebSocket connected");
        Ok(Transport::new(sink, stream))
    }
}
