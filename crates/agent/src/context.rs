//! Context builder — assembles the system prompt and message list.
//!
//! The system prompt is built from four sections joined by horizontal
//! rules: a fixed identity block, any bootstrap documents present in the
//! workspace, a memory excerpt, and the tool catalogue with a listing of
//! workspace skill folders. Missing files are skipped silently.
//!
//! Determinism: given identical session state, workspace files, and
//! registry contents, the output is byte-identical. Nothing time- or
//! environment-dependent goes into the prompt.

use std::path::{Path, PathBuf};

use ferrobot_core::{Message, ToolRegistry};
use ferrobot_session::Session;

/// Bootstrap documents read from the workspace root, in this order.
const BOOTSTRAP_FILES: &[&str] = &["AGENTS.md", "SOUL.md", "USER.md", "TOOLS.md", "IDENTITY.md"];

/// How many session messages are replayed to the LLM.
const HISTORY_WINDOW: usize = 50;

pub struct ContextBuilder {
    workspace: PathBuf,
}

impl ContextBuilder {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self { workspace: workspace.into() }
    }

    /// Assemble the full system prompt.
    pub fn build_system_prompt(&self, registry: &ToolRegistry) -> String {
        let mut parts = vec![self.identity()];

        let bootstrap = self.load_bootstrap_files();
        if !bootstrap.is_empty() {
            parts.push(bootstrap);
        }

        if let Some(memory) = self.load_memory() {
            parts.push(format!("# Memory\n\n{memory}"));
        }

        let tools = self.tool_catalogue(registry);
        if !tools.is_empty() {
            parts.push(format!("# Tools\n\n{tools}"));
        }

        parts.join("\n\n---\n\n")
    }

    fn identity(&self) -> String {
        format!(
            "# Ferrobot\n\n\
             You are Ferrobot, a helpful, efficient AI assistant.\n\
             You have access to tools that allow you to read, write, and edit\n\
             files, list directories, and execute shell commands.\n\n\
             ## Workspace\n\
             Your workspace is at: {ws}\n\
             - Memory files: {ws}/memory/MEMORY.md\n\
             - Custom skills: {ws}/skills/{{skill-name}}/SKILL.md\n\n\
             IMPORTANT: When responding to direct questions, reply directly with text.\n\
             Always be helpful, accurate, and concise.",
            ws = self.workspace.display()
        )
    }

    fn load_bootstrap_files(&self) -> String {
        let mut parts = Vec::new();
        for filename in BOOTSTRAP_FILES {
            let path = self.workspace.join(filename);
            if let Ok(content) = std::fs::read_to_string(&path) {
                parts.push(format!("## {filename}\n\n{content}"));
            }
        }
        parts.join("\n\n")
    }

    fn load_memory(&self) -> Option<String> {
        let path = self.workspace.join("memory").join("MEMORY.md");
        std::fs::read_to_string(path).ok().filter(|s| !s.is_empty())
    }

    /// Tool names and descriptions, plus any skill folders present in
    /// the workspace. Both listings are sorted.
    fn tool_catalogue(&self, registry: &ToolRegistry) -> String {
        let catalogue = registry.catalogue();
        if catalogue.is_empty() {
            return String::new();
        }

        let mut out = String::from("You have the following tools available:\n");
        for (name, description) in &catalogue {
            out.push_str(&format!("- {name}: {description}\n"));
        }

        let mut skills = list_skill_dirs(&self.workspace.join("skills"));
        if !skills.is_empty() {
            skills.sort();
            out.push_str(
                "\nAdditional skills available in workspace (use read_file to view SKILL.md):\n",
            );
            for skill in skills {
                out.push_str(&format!("- {skill}\n"));
            }
        }

        out
    }

    /// Build the full message list for one agent invocation.
    ///
    /// System prompt first, then the bounded history window with the
    /// entry duplicating `current_message` removed, then the current
    /// input as the final user message.
    pub fn build_messages(
        &self,
        registry: &ToolRegistry,
        session: &Session,
        current_message: &str,
        channel: &str,
        chat_id: &str,
    ) -> Vec<Message> {
        let mut system_prompt = self.build_system_prompt(registry);
        if !channel.is_empty() && !chat_id.is_empty() {
            system_prompt
                .push_str(&format!("\n\n## Current Session\nChannel: {channel}\nChat ID: {chat_id}"));
        }

        let mut messages = vec![Message::system(system_prompt)];

        // The caller records the current input in the session before
        // building context, so drop it from the history replay.
        let history = session.history(HISTORY_WINDOW);
        let history = match history.last() {
            Some(last) if last.content == current_message => &history[..history.len() - 1],
            _ => history,
        };

        for entry in history {
            messages.push(Message {
                role: entry.role,
                content: entry.content.clone(),
                tool_calls: Vec::new(),
                tool_call_id: None,
            });
        }

        messages.push(Message::user(current_message));
        messages
    }
}

fn list_skill_dirs(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}
