//! Edit file tool — single targeted text replacement.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use ferrobot_core::{Tool, ToolError, ToolResult};

use crate::expand_home;

#[derive(Default)]
pub struct EditFileTool;

impl EditFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing text. Useful for making targeted changes."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to edit"
                },
                "old_text": {
                    "type": "string",
                    "description": "The text to find and replace"
                },
                "new_text": {
                    "type": "string",
                    "description": "The replacement text"
                }
            },
            "required": ["path", "old_text", "new_text"]
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
        let Some(old_text) = arguments["old_text"].as_str().filter(|t| !t.is_empty()) else {
            return Ok(ToolResult::fail("Error: old_text is required"));
        };
        let new_text = arguments["new_text"].as_str().unwrap_or_default();
        let path = expand_home(path);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolResult::fail(format!(
                    "Error: file not found: {}",
                    path.display()
                )));
            }
            Err(e) => return Ok(ToolResult::fail(format!("Error reading file: {e}"))),
        };

        if !content.contains(old_text) {
            return Ok(ToolResult::fail(format!(
                "Error: text not found in file: {}",
                path.display()
            )));
        }

        // First occurrence only
        let updated = content.replacen(old_text, new_text, 1);
        match tokio::fs::write(&path, updated).await {
            Ok(()) => Ok(ToolResult::ok(format!("Successfully edited {}", path.display()))),
            Err(e) => Ok(ToolResult::fail(format!("Error writing file: {e}"))),
        }
    }
}
