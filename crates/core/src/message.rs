//! Message domain types.
//!
//! Two families of messages flow through the system:
//!
//! - [`InboundMessage`] / [`OutboundMessage`] are the bus-level envelopes
//!   exchanged between channel adapters and the agent loop.
//! - [`Message`] is the LLM exchange unit (role-tagged, with optional
//!   tool-call linkage) stored in sessions and sent to providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::ToolCall;

/// Build the composite conversation key addressing one session.
///
/// Format: `"{channel}:{chat_id}"`, e.g. `"telegram:8731"`.
pub fn conversation_key(channel: &str, chat_id: &str) -> String {
    format!("{channel}:{chat_id}")
}

/// A message received from a channel adapter, headed for the agent loop.
///
/// Immutable once created; consumed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Which channel produced this message ("telegram", "whatsapp", ...).
    pub channel: String,

    /// Platform-specific sender identifier.
    pub sender_id: String,

    /// The chat/group/DM identifier within the channel.
    pub chat_id: String,

    /// The text content.
    pub content: String,

    /// Paths or URLs of attached media, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<String>,

    /// When the message arrived at the adapter.
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            media: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// The conversation key this message belongs to.
    pub fn conversation_key(&self) -> String {
        conversation_key(&self.channel, &self.chat_id)
    }
}

/// A response produced by the agent loop, headed for channel subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Which channel should deliver this message.
    pub channel: String,

    /// The chat to deliver to.
    pub chat_id: String,

    /// The text content.
    pub content: String,
}

/// The role of a message in an LLM conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (identity, rules)
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// Tool execution result
    Tool,
}

/// A single LLM exchange unit.
///
/// Invariant: a `Role::Tool` message must carry `tool_call_id` referencing
/// a tool call from a preceding assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message.
    pub role: Role,

    /// The text content.
    pub content: String,

    /// Tool calls requested by the assistant (if any).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// If this is a tool result, which tool call it responds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create an assistant message carrying tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Create a tool result message keyed by the originating call id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}
