//! Attachment point between the relay and the browser page.
//!
//! At most one page session is current. A newer attach replaces the older
//! one; the older session's call channel is closed so its loop winds down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};

use compat_relay_core::error::{RelayError, Result};

use crate::obs::RelayMetrics;

/// One request handed to the attached page.
#[derive(Debug)]
pub struct BridgeCall {
    pub payload: Bytes,
    pub reply: oneshot::Sender<Result<Bytes>>,
}

type Slot = Option<(u64, mpsc::Sender<BridgeCall>)>;

pub struct BridgeHub {
    slot: watch::Sender<Slot>,
    next_session: AtomicU64,
    attach_timeout: Duration,
    metrics: Arc<RelayMetrics>,
}

impl BridgeHub {
    pub fn new(attach_timeout: Duration, metrics: Arc<RelayMetrics>) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot,
            next_session: AtomicU64::new(1),
            attach_timeout,
            metrics,
        }
    }

    /// Register a new page session and return its call queue.
    pub fn attach(&self) -> (u64, mpsc::Receiver<BridgeCall>) {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        // Single in-flight call per session; a depth of 1 is enough.
        let (tx, rx) = mpsc::channel(1);
        let replaced = self.slot.send_replace(Some((id, tx)));
        if let Some((old, _)) = replaced {
            tracing::warn!(old, new = id, "bridge session replaced by a newer page");
        }
        self.metrics.bridge_attached.set(1);
        (id, rx)
    }

    /// Clear the slot if it still belongs to `session_id`.
    pub fn detach(&self, session_id: u64) {
        let cleared = self.slot.send_if_modified(|slot| match slot {
            Some((id, _)) if *id == session_id => {
                *slot = None;
                true
            }
            _ => false,
        });
        if cleared {
            self.metrics.bridge_attached.set(0);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.slot
            .borrow()
            .as_ref()
            .is_some_and(|(_, tx)| !tx.is_closed())
    }

    /// Send `payload` to the attached page and wait for its reply.
    ///
    /// Waits up to the attach timeout for a page to show up first. If this
    /// future is dropped mid-call the session is retired, so the next call
    /// goes to a fresh page and a late reply can never answer it.
    pub async fn call(&self, payload: Bytes) -> Result<Bytes> {
        let (session, tx) = self.wait_for_session().await?;

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(BridgeCall {
            payload,
            reply: reply_tx,
        })
        .await
        .map_err(|_| RelayError::Invocation("browser session closed before the call was sent".into()))?;

        let mut in_flight = InFlight {
            hub: self,
            session,
            armed: true,
        };
        let reply = reply_rx.await;
        in_flight.armed = false;

        reply.map_err(|_| RelayError::Invocation("browser session dropped the call".into()))?
    }

    async fn wait_for_session(&self) -> Result<(u64, mpsc::Sender<BridgeCall>)> {
        let mut rx = self.slot.subscribe();
        let live = |slot: &Slot| slot.as_ref().is_some_and(|(_, tx)| !tx.is_closed());

        let waited = tokio::time::timeout(self.attach_timeout, rx.wait_for(live)).await;
        let slot = match waited {
            Ok(Ok(slot)) => slot,
            Ok(Err(_)) => return Err(RelayError::Internal("bridge hub closed".into())),
            Err(_) => {
                return Err(RelayError::Invocation(format!(
                    "no browser session attached within {} ms",
                    self.attach_timeout.as_millis()
                )))
            }
        };

        slot.as_ref()
            .map(|(id, tx)| (*id, tx.clone()))
            .ok_or_else(|| RelayError::Internal("bridge slot emptied while borrowed".into()))
    }
}

/// Retires the session if a call is abandoned while waiting for its reply.
struct InFlight<'a> {
    hub: &'a BridgeHub,
    session: u64,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(session = self.session, "bridge call abandoned; retiring session");
            self.hub.detach(self.session);
        }
    }
}
