//! The message bus — a bounded, ordered relay between channel adapters
//! and the agent loop.
//!
//! Inbound: many producers (channel adapters), one logical consumer (the
//! agent loop). The queue is bounded; when it is full, `publish_inbound`
//! applies backpressure by suspending the producer rather than dropping
//! messages.
//!
//! Outbound: the agent loop enqueues responses, and a single dispatch
//! task fans each message out to every subscriber registered for the
//! message's channel (broadcast, not work-stealing). A failing subscriber
//! callback is caught and logged; it never affects other subscribers or
//! the dispatch loop. Per-subscriber delivery order is enqueue order.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ferrobot_core::{BusError, ChannelError, InboundMessage, OutboundMessage};

/// An async delivery callback registered for one channel.
pub type Subscriber =
    Arc<dyn Fn(OutboundMessage) -> BoxFuture<'static, Result<(), ChannelError>> + Send + Sync>;

/// The two-directional message bus.
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    outbound_rx: Mutex<mpsc::Receiver<OutboundMessage>>,
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
}

impl MessageBus {
    /// Create a bus with the default queue capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a bus with an explicit per-direction queue capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        Self {
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            outbound_tx,
            outbound_rx: Mutex::new(outbound_rx),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Enqueue an inbound message for the agent loop.
    ///
    /// Suspends when the queue is at capacity (backpressure); never drops.
    pub async fn publish_inbound(&self, msg: InboundMessage) -> Result<(), BusError> {
        self.inbound_tx.send(msg).await.map_err(|_| BusError::Closed)
    }

    /// Block until an inbound message is available or `cancel` fires.
    ///
    /// Returns `BusError::Cancelled` on cancellation — never partial data.
    pub async fn consume_inbound(
        &self,
        cancel: &CancellationToken,
    ) -> Result<InboundMessage, BusError> {
        let mut rx = self.inbound_rx.lock().await;
        tokio::select! {
            _ = cancel.cancelled() => Err(BusError::Cancelled),
            msg = rx.recv() => msg.ok_or(BusError::Closed),
        }
    }

    /// Enqueue an outbound message for dispatch.
    pub async fn publish_outbound(&self, msg: OutboundMessage) -> Result<(), BusError> {
        self.outbound_tx.send(msg).await.map_err(|_| BusError::Closed)
    }

    /// Register a delivery callback for a channel.
    ///
    /// Every subscriber registered for a channel receives every message
    /// published for that channel.
    pub fn subscribe(&self, channel: impl Into<String>, subscriber: Subscriber) {
        let channel = channel.into();
        debug!(channel = %channel, "Subscriber registered");
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(channel)
            .or_default()
            .push(subscriber);
    }

    /// Drain the outbound queue, invoking matching subscriber callbacks,
    /// until `cancel` fires or the queue closes.
    ///
    /// Runs as a long-lived task owned by the top-level service.
    pub async fn dispatch_outbound(&self, cancel: CancellationToken) {
        let mut rx = self.outbound_rx.lock().await;
        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Outbound dispatch stopping (cancelled)");
                    return;
                }
                msg = rx.recv() => match msg {
                    Some(msg) => msg,
                    None => return,
                },
            };

            let targets: Vec<Subscriber> = {
                let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
                subs.get(&msg.channel).cloned().unwrap_or_default()
            };

            if targets.is_empty() {
                warn!(channel = %msg.channel, "No subscriber for outbound message");
                continue;
            }

            for subscriber in targets {
                if let Err(e) = subscriber(msg.clone()).await {
                    warn!(channel = %msg.channel, error = %e, "Subscriber delivery failed");
                }
            }
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
