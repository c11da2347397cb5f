//! Connection state machine
//!
//! Owns the single gateway transport and drives
//! `Disconnected -> Connecting -> Connected -> Disconnected`, with `Failed`
//! reached when an attempt errors. Connect is single-flight: callers that
//! arrive while an attempt is running await that same attempt.
//!
//! Every established transport gets a fresh epoch. Requests are tagged with
//! the epoch they were sent on, so closing one transport fails exactly the
//! requests that were riding on it.

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::correlation::Correlator;
use super::protocol::{RequestFrame, PROTOCOL_VERSION};
use super::transport::{Connector, FrameSink, FrameStream, Transport};
use crate::error::{Error, Result};

/// Externally visible connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No transport, no attempt running
    Disconnected,
    /// An attempt is in flight
    Connecting,
    /// Transport is live
    Connected,
    /// The last attempt errored; a new `connect()` may be issued
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// A connect attempt every concurrent caller can await
type ConnectAttempt = Shared<BoxFuture<'static, std::result::Result<(), String>>>;

enum Phase {
    Disconnected,
    Connecting { epoch: u64, attempt: ConnectAttempt },
    Connected(Live),
    Failed(String),
}

impl Phase {
    fn state(&self) -> ConnectionState {
        match self {
            Phase::Disconnected => ConnectionState::Disconnected,
            Phase::Connecting { .. } => ConnectionState::Connecting,
            Phase::Connected(_) => ConnectionState::Connected,
            Phase::Failed(_) => ConnectionState::Failed,
        }
    }
}

/// The live transport
struct Live {
    epoch: u64,
    sink: Arc<tokio::sync::Mutex<FrameSink>>,
    reader: JoinHandle<()>,
}

/// Gateway connection with single-flight connect
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    url: String,
    connect_timeout: Duration,
    connector: Arc<dyn Connector>,
    correlator: Correlator,
    phase: Mutex<Phase>,
    next_epoch: AtomicU64,
}

impl Connection {
    /// Create a disconnected connection to `url`
    pub fn new(url: impl Into<String>, connect_timeout: Duration, connector: Arc<dyn Connector>) -> Self {
        Connection {
            inner: Arc::new(ConnectionInner {
                url: url.into(),
                connect_timeout,
                connector,
                correlator: Correlator::new(),
                phase: Mutex::new(Phase::Disconnected),
                next_epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Gateway address
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Current state; never waits on I/O
    pub fn state(&self) -> ConnectionState {
        self.inner.phase().state()
    }

    /// Whether the transport is live
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Message of the last failed attempt, while in `Failed`
    pub fn last_error(&self) -> Option<String> {
        match &*self.inner.phase() {
            Phase::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Number of requests awaiting a reply
    pub fn pending_requests(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    /// Connect, or join the attempt already in flight.
    ///
    /// No-op when connected. On failure the state becomes `Failed` and
    /// every joined caller receives `ConnectFailed`.
    pub async fn connect(&self) -> Result<()> {
        let attempt = {
            let mut phase = self.inner.phase();
            match &*phase {
                Phase::Connected(_) => return Ok(()),
                Phase::Connecting { attempt, .. } => {
                    debug!(url = %self.inner.url, "Joining in-flight connect attempt");
                    attempt.clone()
                }
                Phase::Disconnected | Phase::Failed(_) => {
                    let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(url = %self.inner.url, epoch, "Connecting to OpenClaw Gateway");

                    // Run the attempt as its own task so it completes even if every caller goes away
                    let task = tokio::spawn(Arc::clone(&self.inner).establish(epoch));
                    let attempt = task
                        .map(|joined| match joined {
                            Ok(outcome) => outcome,
                            Err(e) => Err(format!("connect task failed: {}", e)),
                        })
                        .boxed()
                        .shared();

                    *phase = Phase::Connecting {
                        epoch,
                        attempt: attempt.clone(),
                    };
                    attempt
                }
            }
        };

        attempt.await.map_err(Error::ConnectFailed)
    }

    /// Close the transport and fail everything still pending on it
    pub async fn disconnect(&self) {
        let previous = std::mem::replace(&mut *self.inner.phase(), Phase::Disconnected);

        match previous {
            Phase::Connected(live) => {
                live.reader.abort();
                let failed = self
                    .inner
                    .correlator
                    .fail_epoch(live.epoch, "disconnected by client");

                let mut sink = live.sink.lock().await;
                if let Err(e) = sink.close().await {
                    debug!(error = %e, "Error closing gateway transport");
                }
                info!(url = %self.inner.url, failed, "Disconnected from OpenClaw Gateway");
            }
            Phase::Connecting { epoch, .. } => {
                info!(url = %self.inner.url, epoch, "Abandoning in-flight connect attempt");
            }
            Phase::Disconnected | Phase::Failed(_) => {}
        }
    }

    /// Send one request and await its correlated reply.
    ///
    /// `timeout` bounds the whole call: writing the frame and waiting for the
    /// reply share one deadline.
    pub async fn call(&self, method: &str, payload: Value, timeout: Duration) -> Result<Value> {
        let deadline = tokio::time::Instant::now() + timeout;

        // Register under the state lock so a concurrent close cannot miss this entry
        let (pending, sink) = {
            let phase = self.inner.phase();
            let Phase::Connected(live) = &*phase else {
                return Err(Error::NotConnected);
            };
            (
                self.inner.correlator.register(method, live.epoch),
                Arc::clone(&live.sink),
            )
        };

        let frame = RequestFrame::new(pending.id(), method, payload);
        let text = serde_json::to_string(&frame)?;
        debug!(id = %pending.id(), method = %method, "Gateway request");

        let send = async {
            let mut sink = sink.lock().await;
            sink.send(text).await
        };
        match tokio::time::timeout_at(deadline, send).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(Error::RequestTimeout(timeout)),
        }

        pending.wait_until(deadline, timeout).await
    }
}

impl ConnectionInner {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn establish(self: Arc<Self>, epoch: u64) -> std::result::Result<(), String> {
        let opened = self.connector.open(&self.url, self.connect_timeout).await;

        let abandoned = {
            let mut phase = self.phase();
            let current = matches!(&*phase, Phase::Connecting { epoch: e, .. } if *e == epoch);

            match opened {
                Ok(Transport { sink, stream }) if current => {
                    // Spawned under the lock: the reader cannot observe a half-installed phase
                    let reader = tokio::spawn(read_loop(
                        Arc::downgrade(&self),
                        self.correlator.clone(),
                        epoch,
                        stream,
                    ));
                    *phase = Phase::Connected(Live {
                        epoch,
                        sink: Arc::new(tokio::sync::Mutex::new(sink)),
                        reader,
                    });
                    info!(url = %self.url, epoch, protocol = PROTOCOL_VERSION, "Connected to OpenClaw Gateway");
                    return Ok(());
                }
                Ok(transport) => transport,
                Err(e) => {
                    let message = match e {
                        Error::ConnectFailed(message) => message,
                        other => other.to_string(),
                    };
                    if current {
                        *phase = Phase::Failed(message.clone());
                    }
                    warn!(url = %self.url, epoch, error = %message, "Gateway connect failed");
                    return Err(message);
                }
            }
        };

        let mut sink = abandoned.sink;
        if let Err(e) = sink.close().await {
            debug!(error = %e, "Error closing abandoned gateway transport");
        }
        Err("connect attempt abandoned by disconnect".to_string())
    }

    /// Transition to `Disconnected` once per transport, then fail its requests
    fn handle_close(&self, epoch: u64, reason: &str) {
        {
            let mut phase = self.phase();
            if !matches!(&*phase, Phase::Connected(live) if live.epoch == epoch) {
                return;
            }
            *phase = Phase::Disconnected;
        }

        let failed = self.correlator.fail_epoch(epoch, reason);
        warn!(url = %self.url, epoch, failed, reason = %reason, "Gateway connection closed");
    }
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        let phase = self
            .phase
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Phase::Connected(live) = phase {
            live.reader.abort();
        }
    }
}

/// Feed inbound frames to the correlator until the transport closes
async fn read_loop(
    owner: Weak<ConnectionInner>,
    correlator: Correlator,
    epoch: u64,
    mut stream: FrameStream,
) {
    debug!(epoch, "Gateway reader started");

    let reason = loop {
        match stream.next().await {
            Some(Ok(text)) => correlator.dispatch(&text),
            Some(Err(e)) => break e.to_string(),
            None => break "gateway closed the connection".to_string(),
        }
    };

    if let Some(owner) = owner.upgrade() {
        owner.handle_close(epoch, &reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::MockConnector;
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn connection(connector: &MockConnector) -> Connection {
        Connection::new("ws://mock", TIMEOUT, Arc::new(connector.clone()))
    }

    #[tokio::test]
    async fn test_concurrent_connects_open_once() {
        let connector = MockConnector::new().with_open_delay(Duration::from_millis(50));
        let conn = Arc::new(connection(&connector));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let conn = Arc::clone(&conn);
                tokio::spawn(async move { conn.connect().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(connector.open_count(), 1);
        assert!(conn.is_connected());

        // Already connected: no-op
        conn.connect().await.unwrap();
        assert_eq!(connector.open_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_is_retryable() {
        let connector = MockConnector::new().failing();
        let conn = connection(&connector);

        let err = conn.connect().await.unwrap_err();
        assert!(matches!(err, Error::ConnectFailed(_)));
        assert_eq!(conn.state(), ConnectionState::Failed);
        assert!(conn.last_error().is_some());

        connector.set_failing(false);
        conn.connect().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Connected);
        assert_eq!(connector.open_count(), 2);
    }

    #[tokio::test]
    async fn test_joined_callers_share_failure() {
        let connector = MockConnector::new()
            .failing()
            .with_open_delay(Duration::from_millis(20));
        let conn = Arc::new(connection(&connector));

        let (a, b) = tokio::join!(conn.connect(), conn.connect());
        assert!(matches!(a, Err(Error::ConnectFailed(_))));
        assert!(matches!(b, Err(Error::ConnectFailed(_))));
        assert_eq!(connector.open_count(), 1);
    }

    #[tokio::test]
    async fn test_call_requires_connection() {
        let connector = MockConnector::new();
        let conn = connection(&connector);
        let err = conn.call("sessions.list", json!({}), TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_concurrent_calls_resolve_by_id() {
        let connector = MockConnector::new();
        let conn = Arc::new(connection(&connector));
        conn.connect().await.unwrap();
        let mut gateway = connector.take_gateway().await;

        let calls: Vec<_> = (0..8)
            .map(|i| {
                let conn = Arc::clone(&conn);
                tokio::spawn(async move { (i, conn.call("echo", json!({ "n": i }), TIMEOUT).await) })
            })
            .collect();

        // Answer in reverse arrival order
        let mut requests = Vec::new();
        for _ in 0..8 {
            requests.push(gateway.next_request().await);
        }
        for request in requests.iter().rev() {
            gateway.reply_ok(&request.id, request.payload.clone());
        }

        for call in calls {
            let (i, result) = call.await.unwrap();
            assert_eq!(result.unwrap(), json!({ "n": i }));
        }
        assert_eq!(conn.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_transport_close_fails_all_pending() {
        let connector = MockConnector::new();
        let conn = Arc::new(connection(&connector));
        conn.connect().await.unwrap();
        let mut gateway = connector.take_gateway().await;

        let calls: Vec<_> = (0..3)
            .map(|_| {
                let conn = Arc::clone(&conn);
                tokio::spawn(async move { conn.call("slow", json!({}), TIMEOUT).await })
            })
            .collect();
        for _ in 0..3 {
            gateway.next_request().await;
        }
        assert_eq!(conn.pending_requests(), 3);

        gateway.close();

        for call in calls {
            assert!(matches!(call.await.unwrap(), Err(Error::ConnectionLost(_))));
        }
        assert_eq!(conn.pending_requests(), 0);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_then_reconnect() {
        let connector = MockConnector::new();
        let conn = Arc::new(connection(&connector));
        conn.connect().await.unwrap();
        let mut gateway = connector.take_gateway().await;

        let pending = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.call("slow", json!({}), TIMEOUT).await })
        };
        gateway.next_request().await;

        conn.disconnect().await;
        assert!(matches!(pending.await.unwrap(), Err(Error::ConnectionLost(_))));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(gateway.client_closed().await);

        conn.connect().await.unwrap();
        assert_eq!(connector.open_count(), 2);
        assert!(conn.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_abandons_in_flight_connect() {
        let connector = MockConnector::new().with_open_delay(Duration::from_millis(100));
        let conn = Arc::new(connection(&connector));

        let callers: Vec<_> = (0..2)
            .map(|_| {
                let conn = Arc::clone(&conn);
                tokio::spawn(async move { conn.connect().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(conn.state(), ConnectionState::Connecting);

        conn.disconnect().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        for caller in callers {
            assert!(matches!(caller.await.unwrap(), Err(Error::ConnectFailed(_))));
        }
        assert_eq!(connector.open_count(), 1);
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        // The transport that opened late was closed, not installed
        let mut late = connector.take_gateway().await;
        assert!(late.client_closed().await);

        conn.connect().await.unwrap();
        assert_eq!(connector.open_count(), 2);
        assert!(conn.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_send_counts_against_timeout() {
        let connector = MockConnector::new().with_send_delay(Duration::from_secs(3));
        let conn = connection(&connector);
        conn.connect().await.unwrap();
        let _gateway = connector.take_gateway().await;

        let started = tokio::time::Instant::now();
        let err = conn
            .call("sessions.list", json!({}), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestTimeout(d) if d == Duration::from_secs(5)));
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(conn.pending_requests(), 0);

        // A send that alone outlasts the bound times out at the bound too
        let started = tokio::time::Instant::now();
        let err = conn
            .call("sessions.list", json!({}), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestTimeout(_)));
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(conn.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_call_times_out() {
        let connector = MockConnector::new();
        let conn = connection(&connector);
        conn.connect().await.unwrap();
        let _gateway = connector.take_gateway().await;

        let err = conn
            .call("sessions.list", json!({}), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestTimeout(_)));
        assert_eq!(conn.pending_requests(), 0);
        // Timing out a request does not tear down the connection
        assert!(conn.is_connected());
    }
}
