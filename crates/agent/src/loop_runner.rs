//! The agent loop — the iterative tool-calling state machine.
//!
//! One invocation: build the message list, then cycle up to
//! `max_iterations` times. Each cycle calls the LLM with the current
//! messages and the full tool catalogue; a response without tool calls
//! terminates the cycle, otherwise every tool call is executed in order
//! and its result appended before the next cycle. Hitting the cap
//! produces a fixed fallback message rather than an error.
//!
//! Two entry points share the machine: [`AgentLoop::process_direct`]
//! (synchronous request/response, used by the gateway and the CLI) and
//! [`AgentLoop::run`] (consumes the bus and publishes responses).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ferrobot_bus::MessageBus;
use ferrobot_core::{
    BusError, ChatRequest, Error, Message, OutboundMessage, Provider, Role, ToolRegistry,
};
use ferrobot_session::SessionStore;

use crate::context::ContextBuilder;

/// What the loop returns when the iteration cap is hit.
const MAX_ITERATIONS_MESSAGE: &str = "Max iterations reached. Please try a simpler request.";

pub struct AgentLoopOptions {
    pub bus: Arc<MessageBus>,
    pub provider: Arc<dyn Provider>,
    pub registry: Arc<ToolRegistry>,
    pub sessions: Arc<SessionStore>,
    pub workspace: std::path::PathBuf,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_iterations: u32,
}

pub struct AgentLoop {
    bus: Arc<MessageBus>,
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionStore>,
    context: ContextBuilder,
    model: String,
    max_tokens: u32,
    temperature: f32,
    max_iterations: u32,
}

impl AgentLoop {
    pub fn new(opts: AgentLoopOptions) -> Self {
        let max_iterations = if opts.max_iterations == 0 { 20 } else { opts.max_iterations };
        Self {
            bus: opts.bus,
            provider: opts.provider,
            registry: opts.registry,
            sessions: opts.sessions,
            context: ContextBuilder::new(opts.workspace),
            model: opts.model,
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
            max_iterations,
        }
    }

    /// Consume inbound messages from the bus until cancellation.
    ///
    /// A failed turn becomes a one-line error reply to the conversation;
    /// it never stops the loop.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), Error> {
        info!("Agent loop started");

        loop {
            let msg = match self.bus.consume_inbound(&cancel).await {
                Ok(msg) => msg,
                Err(BusError::Cancelled) => {
                    info!("Agent loop stopping");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            let key = msg.conversation_key();
            let response = match self.process_direct(&cancel, &msg.content, &key).await {
                Ok(response) => response,
                Err(e) => {
                    error!(key = %key, error = %e, "Failed to process message");
                    format!("Error: {}", ferrobot_security::sanitize_error(&e))
                }
            };

            if !response.is_empty()
                && let Err(e) = self
                    .bus
                    .publish_outbound(OutboundMessage {
                        channel: msg.channel,
                        chat_id: msg.chat_id,
                        content: response,
                    })
                    .await
            {
                error!(error = %e, "Failed to publish response");
            }
        }
    }

    /// Process one input synchronously: append it to the session, run
    /// the iteration cycle, append and persist the final response.
    pub async fn process_direct(
        &self,
        cancel: &CancellationToken,
        content: &str,
        session_key: &str,
    ) -> Result<String, Error> {
        let (channel, chat_id) = match session_key.split_once(':') {
            Some((channel, chat_id)) => (channel, chat_id),
            None => ("cli", "default"),
        };

        let session = self.sessions.get_or_create(session_key);
        let mut session = session.lock().await;
        session.add_message(Role::User, content);

        let messages =
            self.context.build_messages(&self.registry, &session, content, channel, chat_id);

        let response = self.run_cycle(cancel, messages).await?;

        session.add_message(Role::Assistant, &response);
        if let Err(e) = self.sessions.save(&session).await {
            // In-memory state stays authoritative until the next save
            warn!(key = %session_key, error = %e, "Failed to persist session");
        }

        Ok(response)
    }

    async fn run_cycle(
        &self,
        cancel: &CancellationToken,
        mut messages: Vec<Message>,
    ) -> Result<String, Error> {
        let tools = self.registry.definitions();

        for iteration in 0..self.max_iterations {
            let response = self
                .provider
                .chat(ChatRequest {
                    messages: messages.clone(),
                    tools: tools.clone(),
                    model: self.model.clone(),
                    max_tokens: self.max_tokens,
                    temperature: self.temperature,
                })
                .await?;

            if response.tool_calls.is_empty() {
                return Ok(response.content);
            }

            debug!(iteration, calls = response.tool_calls.len(), "Executing tool calls");
            messages.push(Message::assistant_with_calls(
                response.content,
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let result = self.registry.execute(cancel, call).await?;
                debug!(tool = %call.name, result_length = result.len(), "Tool executed");
                messages.push(Message::tool_result(&call.id, result));
            }
        }

        Ok(MAX_ITERATIONS_MESSAGE.to_string())
    }
}
