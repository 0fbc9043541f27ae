//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation (plus the tool catalogue)
//! to an LLM and return the response. The wire protocol is opaque to the
//! rest of the system; the agent loop only sees this contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// A structured request, emitted by the LLM, to invoke a named tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the provider's tool_call id).
    pub id: String,

    /// Name of the tool to execute. Must resolve in the ToolRegistry at
    /// execution time; unresolved names are reported back as text, not
    /// treated as a fatal fault.
    pub name: String,

    /// Argument mapping as a JSON object.
    pub arguments: serde_json::Value,
}

/// A tool definition sent to the LLM so it knows what it can call.
///
/// Regenerated from the registry per agent-loop invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A request to the LLM.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A complete response from the LLM.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant's text content (may be empty when tool calls are present).
    pub content: String,

    /// Tool calls the model wants executed, in the order received.
    pub tool_calls: Vec<ToolCall>,

    /// Why generation stopped ("stop", "tool_calls", "length", ...).
    pub finish_reason: String,

    /// Token usage, if reported.
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The agent loop calls `chat()` without knowing which backend is in use.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g. "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn chat(&self, request: ChatRequest) -> std::result::Result<ChatResponse, ProviderError>;
}
