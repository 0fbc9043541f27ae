//! Built-in tool implementations for Ferrobot.
//!
//! Tools give the agent the ability to act in the workspace: read,
//! write, and edit files, list directories, and execute shell commands
//! under the command-safety guard.

pub mod exec;
pub mod file_edit;
pub mod file_read;
pub mod file_write;
pub mod list_dir;

use std::path::{Path, PathBuf};
use std::time::Duration;

use ferrobot_core::ToolRegistry;

pub use exec::ExecTool;
pub use file_edit::EditFileTool;
pub use file_read::ReadFileTool;
pub use file_write::WriteFileTool;
pub use list_dir::ListDirTool;

/// Create the default tool registry.
///
/// `workspace` is the agent's working root; `exec_timeout` and
/// `restrict_to_workspace` configure the shell guard.
pub fn default_registry(
    workspace: &Path,
    exec_timeout: Duration,
    restrict_to_workspace: bool,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ReadFileTool::new()));
    registry.register(Box::new(WriteFileTool::new()));
    registry.register(Box::new(EditFileTool::new()));
    registry.register(Box::new(ListDirTool::new()));
    registry.register(Box::new(ExecTool::new(
        exec_timeout,
        restrict_to_workspace,
        workspace.to_path_buf(),
    )));
    registry
}

/// Expand a leading `~` against `$HOME`.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(path.replacen('~', &home, 1));
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_the_builtins() {
        let registry = default_registry(Path::new("/tmp/ws"), Duration::from_secs(60), true);
        let names: Vec<String> = registry.catalogue().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["edit_file", "exec", "list_dir", "read_file", "write_file"]);
    }
}
