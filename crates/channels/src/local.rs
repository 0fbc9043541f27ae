//! In-process "local" channel.
//!
//! The CLI and the gateway's `/chat` route do not need a wire protocol;
//! this adapter completes the channel contract for them by printing
//! outbound messages to stdout. It also doubles as the reference
//! implementation of the allow-list check.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ferrobot_core::{Channel, ChannelError, OutboundMessage, allow_list_permits};

pub struct LocalChannel {
    allow_from: Vec<String>,
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl LocalChannel {
    pub fn new(allow_from: Vec<String>) -> Self {
        Self { allow_from }
    }
}

#[async_trait]
impl Channel for LocalChannel {
    fn name(&self) -> &str {
        "local"
    }

    async fn start(&self, cancel: CancellationToken) -> Result<(), ChannelError> {
        // Inbound traffic arrives through the HTTP surface, not a socket.
        cancel.cancelled().await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        debug!(chat_id = %msg.chat_id, "Local delivery");
        println!("[{}] {}", msg.chat_id, msg.content);
        Ok(())
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        allow_list_permits(&self.allow_from, sender_id)
    }
}
