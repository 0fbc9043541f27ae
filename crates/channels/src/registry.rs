//! Channel registry — manages all active channel adapters.
//!
//! Adapters publish inbound messages onto the bus themselves; the
//! registry's job is lifecycle (start/stop) and outbound wiring: each
//! registered channel gets a bus subscription that forwards matching
//! [`OutboundMessage`]s to its `send`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ferrobot_bus::MessageBus;
use ferrobot_core::{Channel, OutboundMessage};

/// Central registry holding all enabled channel adapters.
pub struct ChannelRegistry {
    channels: HashMap<String, Arc<dyn Channel>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self { channels: HashMap::new() }
    }

    /// Register a channel adapter.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        let name = channel.name().to_string();
        info!(channel = %name, "Registered channel");
        self.channels.insert(name, channel);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Channel>> {
        self.channels.get(name)
    }

    pub fn list(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Subscribe every registered channel to the bus so outbound
    /// messages for its name reach its `send`.
    pub fn attach_to_bus(&self, bus: &MessageBus) {
        for (name, channel) in &self.channels {
            let channel = channel.clone();
            bus.subscribe(
                name.clone(),
                Arc::new(move |msg: OutboundMessage| {
                    let channel = channel.clone();
                    Box::pin(async move { channel.send(&msg).await })
                }),
            );
        }
    }

    /// Start every channel's receive loop on its own task.
    ///
    /// A channel that fails to start is logged and skipped; the others
    /// keep running.
    pub fn start_all(&self, cancel: CancellationToken) {
        for (name, channel) in &self.channels {
            let name = name.clone();
            let channel = channel.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                info!(channel = %name, "Starting channel");
                if let Err(e) = channel.start(cancel).await {
                    error!(channel = %name, error = %e, "Channel stopped with error");
                }
            });
        }
    }

    /// Stop all channels gracefully.
    pub async fn stop_all(&self) {
        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!(channel = %name, error = %e, "Failed to stop channel");
            }
        }
    }
}
