//! List directory tool.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use ferrobot_core::{Tool, ToolError, ToolResult};

use crate::expand_home;

#[derive(Default)]
pub struct ListDirTool;

impl ListDirTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the contents of a directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The directory path to list"
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
        let path = expand_home(arguments["path"].as_str().unwrap_or("."));

        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolResult::fail(format!(
                    "Error: directory not found: {}",
                    path.display()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Ok(ToolResult::fail(format!(
                    "Error: permission denied: {}",
                    path.display()
                )));
            }
            Err(e) => return Ok(ToolResult::fail(format!("Error reading directory: {e}"))),
        };

        let mut lines = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            match entry.metadata().await {
                Ok(meta) if meta.is_dir() => lines.push(format!("  [DIR]  {name}/")),
                Ok(meta) => lines.push(format!("  [FILE] {name} ({} bytes)", meta.len())),
                Err(_) => lines.push(format!("  [FILE] {name}")),
            }
        }
        // read_dir order is platform-dependent
        lines.sort();

        let mut result = format!("Contents of {}:\n", path.display());
        result.push_str(&lines.join("\n"));
        Ok(ToolResult::ok(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "12345").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let tool = ListDirTool::new();
        let cancel = CancellationToken::new();
        let result = tool
            .execute(&cancel, serde_json::json!({"path": dir.path().to_str().unwrap()}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("[FILE] a.txt (5 bytes)"));
        assert!(result.output.contains("[DIR]  sub/"));
    }

    #[tokio::test]
    async fn missing_directory_is_text() {
        let tool = ListDirTool::new();
        let cancel = CancellationToken::new();
        let result = tool
            .execute(&cancel, serde_json::json!({"path": "/definitely/not/here"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("directory not found"));
    }
}
