//! Write file tool. Creates parent directories as needed.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use ferrobot_core::{Tool, ToolError, ToolResult};

use crate::expand_home;

#[derive(Default)]
pub struct WriteFileTool;

impl WriteFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file at the specified path. Creates parent directories if needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(
        &self,
        _cancel: &CancellationToken,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let Some(path) = arguments["path"].as_str().filter(|p| !p.is_empty()) else {
            return Ok(ToolResult::fail("Error: path is required"));
        };
        let content = arguments["content"].as_str().unwrap_or_default();
        let path = expand_home(path);

        if let Some(parent) = path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::fail(format!("Error creating directory: {e}")));
        }

        match tokio::fs::write(&path, content).await {
            Ok(()) => Ok(ToolResult::ok(format!(
                "Successfully wrote {} bytes to {}",
                content.len(),
                path.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(ToolResult::fail(
                format!("Error: permission denied: {}", path.display()),
            )),
            Err(e) => Ok(ToolResult::fail(format!("Error writing file: {e}"))),
        }
    }
}
