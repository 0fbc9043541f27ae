//! Channel trait — the abstraction over chat platforms.
//!
//! A Channel connects Ferrobot to a messaging platform. Adapters publish
//! [`InboundMessage`]s onto the bus and deliver [`OutboundMessage`]s back
//! to the platform; the agent never talks to a platform directly.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ChannelError;
use crate::message::OutboundMessage;

/// The channel adapter contract.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable channel name ("telegram", "whatsapp", "cli", ...). Doubles
    /// as the routing key for outbound dispatch.
    fn name(&self) -> &str;

    /// Start receiving messages. Implementations run their own polling or
    /// socket loop until `cancel` fires.
    async fn start(&self, cancel: CancellationToken) -> Result<(), ChannelError>;

    /// Stop the channel gracefully.
    async fn stop(&self) -> Result<(), ChannelError>;

    /// Deliver an outbound message to the platform.
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;

    /// Allow-list check for a sender.
    ///
    /// An empty allow-list means allow everyone. This is an intentional,
    /// documented insecure default inherited from the original system;
    /// operators are expected to populate `allow_from` in production.
    fn is_allowed(&self, sender_id: &str) -> bool;
}

/// Shared allow-list semantics for adapters.
///
/// An empty list allows everyone; otherwise exact-match on sender id.
pub fn allow_list_permits(allow_from: &[String], sender_id: &str) -> bool {
    allow_from.is_empty() || allow_from.iter().any(|s| s == sender_id)
}
