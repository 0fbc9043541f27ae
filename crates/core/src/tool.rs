//! Tool trait and registry — the abstraction over agent capabilities.
//!
//! Tools are what let the agent act in the world: read and write files,
//! execute shell commands, and so on. Each tool describes itself with a
//! name, a description, and a JSON-schema parameter contract; the agent
//! loop hands the catalogue to the LLM and executes calls by name.
//!
//! Error policy: tools convert every foreseeable failure caused by the
//! caller's input (missing file, bad argument, policy refusal) into a
//! descriptive text result. The error channel is reserved for
//! infrastructure failures such as cancellation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ToolError;
use crate::provider::{ToolCall, ToolDefinition};

/// The result of a tool execution.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Whether the underlying operation succeeded. Policy refusals and
    /// user-input problems are `false` with a descriptive `output`.
    pub success: bool,

    /// The output content handed back to the LLM.
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { success: true, output: output.into() }
    }

    pub fn fail(output: impl Into<String>) -> Self {
        Self { success: false, output: output.into() }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique, stable name of this tool (e.g. "exec", "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    ///
    /// `cancel` propagates process shutdown; implementations doing slow
    /// I/O should abort promptly when it fires.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// Read-only during a loop run: the agent loop regenerates the definition
/// list per invocation and executes calls by name. A BTreeMap keeps the
/// catalogue ordering stable so assembled prompts are deterministic.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: BTreeMap::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM), in name order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List (name, description) pairs for the prompt tool catalogue.
    pub fn catalogue(&self) -> Vec<(String, String)> {
        self.tools
            .values()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }

    /// Execute a tool call, converting all failures except cancellation
    /// into a textual result the LLM can observe and recover from.
    ///
    /// Unresolved names yield a "Tool not found" text, not an error.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        call: &ToolCall,
    ) -> std::result::Result<String, ToolError> {
        let Some(tool) = self.tools.get(&call.name) else {
            return Ok(format!("Tool not found: {}", call.name));
        };

        debug!(tool = %call.name, call_id = %call.id, "Executing tool");

        match tool.execute(cancel, call.arguments.clone()).await {
            Ok(result) => Ok(result.output),
            Err(e @ ToolError::Cancelled(_)) => Err(e),
            Err(e) => Ok(format!("Error: {e}")),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            _cancel: &CancellationToken,
            arguments: serde_json::Value,
        ) -> Result<ToolResult, ToolError> {
            match arguments["text"].as_str() {
                Some(text) => Ok(ToolResult::ok(text)),
                None => Err(ToolError::InvalidArguments("missing 'text'".into())),
            }
        }
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall { id: "call_1".into(), name: name.into(), arguments: args }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn definitions_are_name_ordered() {
        struct Named(&'static str);
        #[async_trait]
        impl Tool for Named {
            fn name(&self) -> &str { self.0 }
            fn description(&self) -> &str { "test" }
            fn parameters_schema(&self) -> serde_json::Value {
                serde_json::json!({"type": "object"})
            }
            async fn execute(
                &self,
                _cancel: &CancellationToken,
                _arguments: serde_json::Value,
            ) -> Result<ToolResult, ToolError> {
                Ok(ToolResult::ok(""))
            }
        }

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(Named("zeta")));
        registry.register(Box::new(Named("alpha")));
        let defs = registry.definitions();
        assert_eq!(defs[0].name, "alpha");
        assert_eq!(defs[1].name, "zeta");
    }

    #[tokio::test]
    async fn execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let cancel = CancellationToken::new();
        let out = registry
            .execute(&cancel, &call("echo", serde_json::json!({"text": "hello"})))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn missing_tool_is_text_not_error() {
        let registry = ToolRegistry::new();
        let cancel = CancellationToken::new();
        let out = registry
            .execute(&cancel, &call("nonexistent", serde_json::json!({})))
            .await
            .unwrap();
        assert!(out.contains("Tool not found"));
    }

    #[tokio::test]
    async fn bad_arguments_become_text() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let cancel = CancellationToken::new();
        let out = registry
            .execute(&cancel, &call("echo", serde_json::json!({})))
            .await
            .unwrap();
        assert!(out.starts_with("Error:"), "got: {out}");
    }
}
