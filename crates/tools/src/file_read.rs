//! Read file tool.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use ferrobot_core::{Tool, ToolError, ToolResult};

use crate::expand_home;

#[derive(Default)]
pub struct ReadFileTool;

impl ReadFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the specified path."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to read"
                }
            },
            "required": ["path"]
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
        let path = expand_home(path);

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(ToolResult::ok(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ToolResult::fail(
                format!("Error: file not found: {}", path.display()),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(ToolResult::fail(
                format!("Error: permission denied: {}", path.display()),
            )),
            Err(e) => Ok(ToolResult::fail(format!("Error reading file: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Hello, world!").unwrap();

        let tool = ReadFileTool::new();
        let cancel = CancellationToken::new();
        let result = tool
            .execute(&cancel, serde_json::json!({"path": path.to_str().unwrap()}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "Hello, world!");
    }

    #[tokio::test]
    async fn missing_file_is_text_not_error() {
        let tool = ReadFileTool::new();
        let cancel = CancellationToken::new();
        let result = tool
            .execute(&cancel, serde_json::json!({"path": "/nonexistent/definitely/missing.txt"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("file not found"));
    }

    #[tokio::test]
    async fn missing_path_argument_is_text() {
        let tool = ReadFileTool::new();
        let cancel = CancellationToken::new();
        let result = tool.execute(&cancel, serde_json::json!({})).await.unwrap();
        assert_eq!(result.output, "Error: path is required");
    }
}
