//! Command safety policy for shell execution.
//!
//! Two pattern families, compiled once at startup: deny patterns matching
//! destructive commands, and traversal patterns matching `..` path
//! escapes. On top of those, an explicit working directory must resolve
//! inside the configured workspace when confinement is enabled.
//!
//! Regex matching on command text is advisory, not a sandbox. A symlink
//! or a shell alias can sidestep the textual check; the guard is
//! defense-in-depth for an LLM-driven tool, nothing more.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

/// Regexes for destructive commands.
const DENY_PATTERNS: &[&str] = &[
    r"\brm\s+(-[rf]+\s+)*[/~]",  // rm targeting root or home
    r"\brm\s+-rf\b",             // rm -rf anywhere
    r"\bdd\b.*\bof=/dev/",       // dd onto a raw device
    r"\bmkfs\b",                 // filesystem format
    r"\bfdisk\b",                // partition tool
    r"\bformat\b",               // Windows format
    r">\s*/dev/",                // redirect onto a device
    r"\bchmod\s+-R\s+777\b",     // recursive world-writable
    r"\bchown\s+-R\b.*[/~]",     // recursive chown on root/home
    r"\b:\(\)\{ :\|:& \};:\b",   // fork bomb
    r"\bshutdown\b",
    r"\breboot\b",
    r"\bhalt\b",
    r"\binit\s+[0-6]\b",
    r"\bsystemctl\s+(start|stop|restart|enable|disable)\b",
];

/// Regexes for `..` path escapes in either separator style.
const TRAVERSAL_PATTERNS: &[&str] = &[r"\.\./", r"\.\.\\", r"/\.\.", r"\\\.\."];

static DENY_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(DENY_PATTERNS));
static TRAVERSAL_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(TRAVERSAL_PATTERNS));

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

/// A policy denial. Not an infrastructure error: callers turn this into
/// refusal text delivered back to the LLM.
#[derive(Debug, thiserror::Error)]
pub enum Denial {
    #[error("Error: command blocked for safety: {pattern}")]
    Blocked { pattern: String },

    #[error("Error: path traversal not allowed")]
    Traversal,

    #[error("Error: working directory must be within workspace")]
    OutsideWorkspace,
}

/// The compiled command-safety policy.
pub struct CommandGuard {
    restrict_to_workspace: bool,
    workspace: Option<PathBuf>,
}

impl CommandGuard {
    pub fn new(restrict_to_workspace: bool, workspace: Option<PathBuf>) -> Self {
        Self { restrict_to_workspace, workspace }
    }

    /// Check a command and its optional working directory against policy.
    ///
    /// Order matters: deny patterns apply unconditionally; traversal and
    /// working-directory checks apply only under workspace confinement.
    pub fn check(&self, command: &str, working_dir: Option<&Path>) -> Result<(), Denial> {
        for re in DENY_REGEXES.iter() {
            if re.is_match(command) {
                warn!(pattern = re.as_str(), "Command blocked by deny pattern");
                return Err(Denial::Blocked { pattern: re.as_str().to_string() });
            }
        }

        if self.restrict_to_workspace
            && let Some(workspace) = &self.workspace
        {
            for re in TRAVERSAL_REGEXES.iter() {
                if re.is_match(command) {
                    warn!("Command blocked by traversal pattern");
                    return Err(Denial::Traversal);
                }
            }

            if let Some(dir) = working_dir {
                let abs_workspace = absolute(workspace);
                let abs_dir = absolute(dir);
                if !abs_dir.starts_with(&abs_workspace) {
                    warn!(dir = %dir.display(), "Working directory outside workspace");
                    return Err(Denial::OutsideWorkspace);
                }
            }
        }

        Ok(())
    }
}

/// Resolve to an absolute path without requiring the path to exist.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> CommandGuard {
        CommandGuard::new(true, Some(PathBuf::from("/home/user/workspace")))
    }

    #[test]
    fn destructive_commands_are_blocked() {
        let g = guard();
        for cmd in [
            "rm -rf /",
            "rm -rf ~/",
            "rm -rf ./build",
            "dd if=/dev/zero of=/dev/sda",
            "mkfs.ext4 /dev/sdb1",
            "echo x > /dev/sda",
            "chmod -R 777 /",
            "sudo shutdown now",
            "reboot",
            "systemctl stop sshd",
        ] {
            let result = g.check(cmd, None);
            assert!(
                matches!(result, Err(Denial::Blocked { .. })),
                "expected block for: {cmd}"
            );
        }
    }

    #[test]
    fn benign_commands_pass() {
        let g = guard();
        for cmd in ["ls -la", "cat notes.txt", "grep -r TODO src/", "git status", "rm notes.txt"] {
            assert!(g.check(cmd, None).is_ok(), "expected pass for: {cmd}");
        }
    }

    #[test]
    fn traversal_blocked_under_confinement() {
        let g = guard();
        assert!(matches!(g.check("cat ../../etc/passwd", None), Err(Denial::Traversal)));
        assert!(matches!(g.check("type ..\\secrets.txt", None), Err(Denial::Traversal)));
    }

    #[test]
    fn traversal_allowed_without_confinement() {
        let g = CommandGuard::new(false, Some(PathBuf::from("/home/user/workspace")));
        assert!(g.check("cat ../notes.txt", None).is_ok());
    }

    #[test]
    fn working_dir_outside_workspace_refused() {
        let g = guard();
        let result = g.check("ls", Some(Path::new("/tmp/elsewhere")));
        assert!(matches!(result, Err(Denial::OutsideWorkspace)));
    }

    #[test]
    fn working_dir_inside_workspace_allowed() {
        let g = guard();
        assert!(g.check("ls", Some(Path::new("/home/user/workspace/project"))).is_ok());
    }

    #[test]
    fn denial_text_is_stable() {
        let g = guard();
        let err = g.check("rm -rf /", None).unwrap_err();
        assert!(err.to_string().starts_with("Error: command blocked for safety:"));
        let err = g.check("ls", Some(Path::new("/etc"))).unwrap_err();
        assert_eq!(err.to_string(), "Error: working directory must be within workspace");
    }
}
