//! Core domain types and traits for Ferrobot.
//!
//! This crate defines the vocabulary shared by every other crate:
//! messages flowing between channels and the agent, the Channel /
//! Provider / Tool abstractions, and the error taxonomy. It contains
//! no I/O of its own.

pub mod channel;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

pub use channel::{Channel, allow_list_permits};
pub use error::{BusError, ChannelError, Error, ProviderError, Result, SessionError, ToolError};
pub use message::{conversation_key, InboundMessage, Message, OutboundMessage, Role};
pub use provider::{ChatRequest, ChatResponse, Provider, ToolCall, ToolDefinition, Usage};
pub use tool::{Tool, ToolRegistry, ToolResult};
