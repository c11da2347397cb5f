//! In-memory gateway for tests
//!
//! `MockConnector` hands out transports backed by channels and counts open
//! attempts. The far end of the most recent transport is a `MockGateway`
//! that tests drive by hand or with [`MockGateway::serve`].

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::protocol::{error_codes, methods, ProtocolError, RequestFrame, ResponseFrame};
use super::transport::{Connector, Transport};
use crate::error::{Error, Result};

/// Connector that never touches the network
#[derive(Clone, Default)]
pub struct MockConnector {
    inner: Arc<MockConnectorInner>,
}

#[derive(Default)]
struct MockConnectorInner {
    opens: AtomicUsize,
    failing: AtomicBool,
    open_delay: std::sync::Mutex<Option<Duration>>,
    send_delay: std::sync::Mutex<Option<Duration>>,
    gateways: Mutex<Vec<MockGateway>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every open attempt until `set_failing(false)`
    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    /// Delay every open attempt
    pub fn with_open_delay(self, delay: Duration) -> Self {
        if let Ok(mut slot) = self.inner.open_delay.lock() {
            *slot = Some(delay);
        }
        self
    }

    /// Delay every frame the client writes
    pub fn with_send_delay(self, delay: Duration) -> Self {
        if let Ok(mut slot) = self.inner.send_delay.lock() {
            *slot = Some(delay);
        }
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `open` calls so far
    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    /// Far end of the most recently opened transport
    pub async fn take_gateway(&self) -> MockGateway {
        self.inner
            .gateways
            .lock()
            .await
            .pop()
            .expect("no transport has been opened")
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, url: &str, _timeout: Duration) -> Result<Transport> {
        self.inner.opens.fetch_add(1, Ordering::SeqCst);

        let delay = self.inner.open_delay.lock().ok().and_then(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(Error::ConnectFailed(format!("connection refused: {}", url)));
        }

        let (to_gateway, requests) = mpsc::unbounded::<String>();
        let (replies, from_gateway) = mpsc::unbounded::<Result<String>>();

        let send_delay = self.inner.send_delay.lock().ok().and_then(|d| *d);
        let sink = to_gateway
            .sink_map_err(|e| Error::TransportClosed(e.to_string()))
            .with(move |text: String| async move {
                if let Some(delay) = send_delay {
                    tokio::time::sleep(delay).await;
                }
                Ok::<_, Error>(text)
            });
        self.inner.gateways.lock().await.push(MockGateway {
            requests,
            replies: Some(replies),
        });

        Ok(Transport::new(sink, from_gateway))
    }
}

/// Gateway side of a mock transport
pub struct MockGateway {
    requests: mpsc::UnboundedReceiver<String>,
    replies: Option<mpsc::UnboundedSender<Result<String>>>,
}

impl MockGateway {
    /// Next request sent by the client
    pub async fn next_request(&mut self) -> RequestFrame {
        let text = tokio::time::timeout(Duration::from_secs(5), self.requests.next())
            .await
            .expect("client sent no request")
            .expect("client closed the transport");
        serde_json::from_str(&text).expect("client sent an invalid request frame")
    }

    /// Send a raw text frame to the client
    pub fn send_raw(&self, text: impl Into<String>) {
        if let Some(replies) = &self.replies {
            let _ = replies.unbounded_send(Ok(text.into()));
        }
    }

    /// Reply successfully to request `id`
    pub fn reply_ok(&self, id: &str, payload: Value) {
        self.send_frame(ResponseFrame::ok(id, payload));
    }

    /// Reply with an error to request `id`
    pub fn reply_error(&self, id: &str, error: ProtocolError) {
        self.send_frame(ResponseFrame::error(id, error));
    }

    fn send_frame(&self, frame: ResponseFrame) {
        self.send_raw(serde_json::to_string(&frame).expect("response frames serialize"));
    }

    /// Drop the connection from the gateway side
    pub fn close(&mut self) {
        self.replies = None;
    }

    /// Whether the client closed its half (waits briefly)
    pub async fn client_closed(&mut self) -> bool {
        let drained = async {
            while self.requests.next().await.is_some() {}
        };
        tokio::time::timeout(Duration::from_secs(1), drained).await.is_ok()
    }

    /// Answer requests from a fixed session table until the client hangs up.
    ///
    /// `sessions.list` returns every session; `sessions.history` returns the
    /// matching history or a session-not-found error.
    pub fn serve(mut self, sessions: Vec<(Value, Vec<Value>)>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(text) = self.requests.next().await {
                let Ok(request) = serde_json::from_str::<RequestFrame>(&text) else {
                    continue;
                };
                match request.method.as_str() {
                    methods::SESSIONS_LIST => {
                        let list: Vec<Value> = sessions.iter().map(|(s, _)| s.clone()).collect();
                        self.reply_ok(&request.id, Value::Array(list));
                    }
                    methods::SESSIONS_HISTORY => {
                        let wanted = request.payload["sessionId"].as_str().unwrap_or_default();
                        match sessions.iter().find(|(s, _)| s["id"] == json!(wanted)) {
                            Some((_, history)) => {
                                self.reply_ok(&request.id, json!({ "history": history }))
                            }
                            None => self.reply_error(&request.id, ProtocolError::session_not_found(wanted)),
                        }
                    }
                    other => self.reply_error(
                        &request.id,
                        ProtocolError::new(error_codes::METHOD_NOT_FOUND, format!("Method not found: {}", other)),
                    ),
                }
            }
        })
    }
}
