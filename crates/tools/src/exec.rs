//! Exec tool — shell execution behind the command-safety guard.
//!
//! Every command passes the guard first (deny patterns, traversal,
//! workspace confinement); refused commands never spawn a process. The
//! command itself runs under `sh -c` with a hard wall-clock timeout,
//! stdout and stderr captured separately, and stderr reported under a
//! labeled section. A non-zero exit appends the exit code to the output
//! instead of being treated as an error.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ferrobot_core::{Tool, ToolError, ToolResult};
use ferrobot_security::CommandGuard;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ExecTool {
    timeout: Duration,
    workspace: PathBuf,
    guard: CommandGuard,
}

impl ExecTool {
    pub fn new(timeout: Duration, restrict_to_workspace: bool, workspace: PathBuf) -> Self {
        let timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };
        let guard = CommandGuard::new(restrict_to_workspace, Some(workspace.clone()));
        Self { timeout, workspace, guard }
    }
}

enum Waited {
    Status(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

async fn collect(task: tokio::task::JoinHandle<Vec<u8>>, bounded: bool) -> Vec<u8> {
    if bounded {
        match tokio::time::timeout(Duration::from_millis(500), task).await {
            Ok(buf) => buf.unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    } else {
        task.await.unwrap_or_default()
    }
}

#[async_trait]
impl Tool for ExecTool {
    fn name(&self) -> &str {
        "exec"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Optional working directory for the command"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let Some(command) = arguments["command"].as_str().filter(|c| !c.is_empty()) else {
            return Ok(ToolResult::fail("Error: command is required"));
        };
        let working_dir = arguments["working_dir"]
            .as_str()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.workspace.clone());

        // Policy check before anything is spawned
        if let Err(denial) = self.guard.check(command, Some(&working_dir)) {
            return Ok(ToolResult::fail(denial.to_string()));
        }

        debug!(command, dir = %working_dir.display(), "Executing shell command");

        let mut child = match Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return Ok(ToolResult::fail(format!("Error executing command: {e}"))),
        };

        // Drain the pipes concurrently so a killed command still yields
        // whatever it printed before the deadline.
        let mut stdout_pipe = child.stdout.take();
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });
        let mut stderr_pipe = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        let waited = {
            let wait = child.wait();
            tokio::pin!(wait);
            tokio::select! {
                status = &mut wait => Waited::Status(status),
                _ = tokio::time::sleep(self.timeout) => Waited::TimedOut,
                _ = cancel.cancelled() => Waited::Cancelled,
            }
        };

        let killed = matches!(waited, Waited::TimedOut | Waited::Cancelled);
        if killed {
            let _ = child.kill().await;
        }
        if matches!(waited, Waited::Cancelled) {
            return Err(ToolError::Cancelled("exec".into()));
        }

        // A surviving grandchild can keep the pipes open after the kill,
        // so collection is bounded in that case.
        let stdout = String::from_utf8_lossy(&collect(stdout_task, killed).await).into_owned();
        let stderr = String::from_utf8_lossy(&collect(stderr_task, killed).await).into_owned();

        let mut result = String::new();
        if !stdout.is_empty() {
            result.push_str(&stdout);
        }
        if !stderr.is_empty() {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str("STDERR:\n");
            result.push_str(&stderr);
        }

        match waited {
            Waited::TimedOut => Ok(ToolResult::fail(format!(
                "Error: command timed out after {}s\n{result}",
                self.timeout.as_secs()
            ))),
            Waited::Status(Err(e)) => {
                Ok(ToolResult::fail(format!("Error executing command: {e}")))
            }
            Waited::Status(Ok(status)) => {
                if !status.success() {
                    let code = status.code().unwrap_or(-1);
                    result.push_str(&format!("\nExit code: {code}"));
                    return Ok(ToolResult::fail(result));
                }
                if result.is_empty() {
                    return Ok(ToolResult::ok("(no output)"));
                }
                Ok(ToolResult::ok(result))
            }
            Waited::Cancelled => unreachable!(),
        }
    }
}
