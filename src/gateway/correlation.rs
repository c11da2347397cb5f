//! Request/response correlation
//!
//! Turns the asynchronous frame exchange into call/response semantics:
//! every outgoing request gets a fresh id and a pending slot, every inbound
//! response resolves at most one slot, and every slot is removed exactly
//! once (reply, timeout, connection loss, or the caller going away).

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::time::Instant as Deadline;
use tracing::{debug, warn};

use super::protocol::{error_codes, InboundFrame, ProtocolError, ResponseStatus};
use crate::error::{Error, Result};

/// Outcome delivered to a waiting caller
pub type CallOutcome = Result<Value>;

/// An outstanding request
struct PendingRequest {
    /// Method name, for logs
    method: String,
    /// When the request was issued
    issued_at: Instant,
    /// Connection generation the request was sent on
    epoch: u64,
    /// Write-once result slot
    reply: oneshot::Sender<CallOutcome>,
}

type PendingTable = HashMap<String, PendingRequest>;

/// Pending-request table shared by callers and the inbound reader
#[derive(Clone, Default)]
pub struct Correlator {
    inner: Arc<CorrelatorInner>,
}

#[derive(Default)]
struct CorrelatorInner {
    next_id: AtomicU64,
    pending: Mutex<PendingTable>,
}

impl Correlator {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, PendingTable> {
        // No critical section can panic halfway, so a poisoned table is still consistent
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of outstanding requests
    pub fn pending_count(&self) -> usize {
        self.table().len()
    }

    /// Allocate an id and a pending slot for a request sent on `epoch`.
    ///
    /// The returned [`PendingCall`] removes the slot when dropped, so a
    /// caller that stops waiting never leaves an entry behind.
    pub fn register(&self, method: &str, epoch: u64) -> PendingCall {
        let (tx, rx) = oneshot::channel();
        let mut table = self.table();

        // Skip ids still pending after the counter wraps
        let id = loop {
            let candidate = self.inner.next_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            let candidate = candidate.to_string();
            if !table.contains_key(&candidate) {
                break candidate;
            }
        };

        table.insert(
            id.clone(),
            PendingRequest {
                method: method.to_string(),
                issued_at: Instant::now(),
                epoch,
                reply: tx,
            },
        );

        PendingCall {
            id,
            rx: Some(rx),
            correlator: self.clone(),
        }
    }

    /// Route one inbound text frame.
    ///
    /// Unmatched frames are discarded with a warning. A malformed frame that
    /// names a pending id fails that request.
    pub fn dispatch(&self, text: &str) {
        let response = match InboundFrame::parse(text) {
            Ok(InboundFrame::Response(response)) => response,
            Ok(InboundFrame::Event(event)) => {
                debug!(event = %event.event, "Ignoring gateway event");
                return;
            }
            Err(e) => {
                self.reject_malformed(text, &e);
                return;
            }
        };

        let Some(entry) = self.table().remove(&response.id) else {
            warn!(id = %response.id, "Discarding response with no pending request");
            return;
        };

        let outcome = match response.status {
            ResponseStatus::Ok => Ok(response.payload),
            ResponseStatus::Error => Err(gateway_error(ProtocolError::from_payload(response.payload))),
        };

        debug!(
            id = %response.id,
            method = %entry.method,
            elapsed_ms = entry.issued_at.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "Gateway response"
        );

        // Receiver gone means the caller already gave up; nothing to do
        let _ = entry.reply.send(outcome);
    }

    /// A frame that is not a valid response still answers its request if it
    /// names a pending id; that caller gets `Protocol` instead of waiting out
    /// the bound.
    fn reject_malformed(&self, text: &str, reason: &str) {
        let id = serde_json::from_str::<Value>(text)
            .ok()
            .and_then(|value| match value.get("id") {
                Some(Value::String(id)) => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            });

        let Some((id, entry)) = id.and_then(|id| {
            let entry = self.table().remove(&id)?;
            Some((id, entry))
        }) else {
            warn!(error = %reason, "Discarding undecodable gateway frame");
            return;
        };

        warn!(id = %id, method = %entry.method, error = %reason, "Malformed gateway response");
        let _ = entry
            .reply
            .send(Err(Error::Protocol(format!("Malformed response: {}", reason))));
    }

    /// Resolve every entry sent on `epoch` with `ConnectionLost`
    pub fn fail_epoch(&self, epoch: u64, reason: &str) -> usize {
        let drained: Vec<(String, PendingRequest)> = {
            let mut table = self.table();
            let ids: Vec<String> = table
                .iter()
                .filter(|(_, entry)| entry.epoch == epoch)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| table.remove(&id).map(|entry| (id, entry)))
                .collect()
        };

        let count = drained.len();
        for (id, entry) in drained {
            debug!(id = %id, method = %entry.method, "Failing pending request");
            let _ = entry.reply.send(Err(Error::ConnectionLost(reason.to_string())));
        }
        count
    }

    fn forget(&self, id: &str) {
        self.table().remove(id);
    }
}

/// Map a gateway error payload onto the client taxonomy
fn gateway_error(err: ProtocolError) -> Error {
    if err.code == error_codes::SESSION_NOT_FOUND {
        Error::NotFound(err.message)
    } else {
        Error::Gateway {
            code: err.code,
            message: err.message,
        }
    }
}

/// A registered request awaiting its reply
pub struct PendingCall {
    id: String,
    rx: Option<oneshot::Receiver<CallOutcome>>,
    correlator: Correlator,
}

impl PendingCall {
    /// Correlation id to put on the wire
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the reply, bounded by `timeout`
    pub async fn wait(self, timeout: Duration) -> CallOutcome {
        self.wait_until(Deadline::now() + timeout, timeout).await
    }

    /// Wait for the reply until `deadline`; `bound` is the request bound
    /// reported on timeout.
    pub async fn wait_until(mut self, deadline: Deadline, bound: Duration) -> CallOutcome {
        let Some(rx) = self.rx.take() else {
            return Err(Error::Internal("pending call awaited twice".to_string()));
        };

        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without a value: the table was torn down
            Ok(Err(_)) => Err(Error::ConnectionLost("request abandoned".to_string())),
            Err(_) => {
                self.correlator.forget(&self.id);
                warn!(id = %self.id, timeout_ms = bound.as_millis() as u64, "Gateway request timed out");
                Err(Error::RequestTimeout(bound))
            }
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.correlator.forget(&self.id);
    }
}
