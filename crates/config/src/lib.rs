//! Configuration loading, validation, and management for Ferrobot.
//!
//! Loads configuration from `~/.ferrobot/config.toml` with environment
//! variable overrides for secrets. Every knob the orchestration core
//! consumes is validated to a sane default at load time so downstream
//! code never has to re-check for zero or missing values.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration load/parse errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Home directory not found (set HOME)")]
    NoHome,
}

/// The root configuration structure.
///
/// Maps directly to `~/.ferrobot/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub channels: HashMap<String, ChannelConfig>,
    pub providers: HashMap<String, ProviderConfig>,
    pub gateway: GatewayConfig,
    pub tools: ToolsConfig,
}

/// Default agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Workspace root. `~` is expanded on use.
    pub workspace: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Cap on tool-call iterations per conversation turn.
    pub max_tool_iterations: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workspace: "~/.ferrobot/workspace".into(),
            model: "gpt-4o".into(),
            max_tokens: 4096,
            temperature: 0.7,
            max_tool_iterations: 20,
        }
    }
}

/// Settings for one channel adapter.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub enabled: bool,
    pub token: Option<String>,
    /// Allowed sender ids. Empty = allow everyone (insecure default,
    /// preserved deliberately — see the Channel trait docs).
    pub allow_from: Vec<String>,
}

/// Settings for one LLM provider.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
}

/// Gateway server settings, including the boundary-protection knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Token-bucket refill rate, tokens per second per client.
    pub rate_limit_rps: f64,
    /// Token-bucket burst capacity per client.
    pub rate_limit_burst: u32,
    /// Maximum accepted request body, in bytes.
    pub max_body_bytes: usize,
    /// Graceful-drain window on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            // Loopback by default; exposing the gateway is an explicit choice.
            host: "127.0.0.1".into(),
            port: 18790,
            rate_limit_rps: 5.0,
            rate_limit_burst: 10,
            max_body_bytes: 10 << 20,
            shutdown_timeout_secs: 10,
        }
    }
}

impl GatewayConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Tool-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub exec: ExecToolConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { exec: ExecToolConfig::default() }
    }
}

/// Shell execution tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecToolConfig {
    /// Hard wall-clock timeout per command, in seconds.
    pub timeout_secs: u64,
    /// Refuse commands and working directories outside the workspace.
    pub restrict_to_workspace: bool,
}

impl Default for ExecToolConfig {
    fn default() -> Self {
        Self { timeout_secs: 60, restrict_to_workspace: true }
    }
}

impl ExecToolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("agent", &self.agent)
            .field("channels", &self.channels)
            .field("providers", &self.providers)
            .field("gateway", &self.gateway)
            .field("tools", &self.tools)
            .finish()
    }
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("enabled", &self.enabled)
            .field("token", &redact(&self.token))
            .field("allow_from", &self.allow_from)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl AppConfig {
    /// The Ferrobot home directory (`~/.ferrobot`).
    pub fn dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
        Ok(PathBuf::from(home).join(".ferrobot"))
    }

    /// Default config file path.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(Self::dir()?.join("config.toml"))
    }

    /// Load configuration from the default path, falling back to defaults
    /// when no file exists, then apply environment overrides and clamps.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            toml::from_str(&raw)?
        } else {
            warn!(path = %path.display(), "No config file found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.clamp_defaults();
        Ok(config)
    }

    /// Environment overrides for secrets: `FERROBOT_<PROVIDER>_API_KEY`
    /// and `FERROBOT_<CHANNEL>_TOKEN`.
    fn apply_env_overrides(&mut self) {
        for (name, provider) in self.providers.iter_mut() {
            let var = format!("FERROBOT_{}_API_KEY", name.to_uppercase());
            if let Ok(key) = std::env::var(&var) {
                provider.api_key = Some(key);
            }
        }
        for (name, channel) in self.channels.iter_mut() {
            let var = format!("FERROBOT_{}_TOKEN", name.to_uppercase());
            if let Ok(token) = std::env::var(&var) {
                channel.token = Some(token);
            }
        }
    }

    /// Replace zero/negative settings with their documented defaults.
    fn clamp_defaults(&mut self) {
        if self.agent.max_tool_iterations == 0 {
            self.agent.max_tool_iterations = 20;
        }
        if self.gateway.rate_limit_rps <= 0.0 {
            self.gateway.rate_limit_rps = 5.0;
        }
        if self.gateway.rate_limit_burst == 0 {
            self.gateway.rate_limit_burst = 10;
        }
        if self.gateway.max_body_bytes == 0 {
            self.gateway.max_body_bytes = 10 << 20;
        }
        if self.gateway.shutdown_timeout_secs == 0 {
            self.gateway.shutdown_timeout_secs = 10;
        }
        if self.tools.exec.timeout_secs == 0 {
            self.tools.exec.timeout_secs = 60;
        }
    }

    /// Serialize this config back to TOML (for `onboard`).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.agent.max_tool_iterations, 20);
        assert!((config.gateway.rate_limit_rps - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.gateway.rate_limit_burst, 10);
        assert_eq!(config.gateway.max_body_bytes, 10 << 20);
        assert_eq!(config.gateway.shutdown_timeout_secs, 10);
        assert_eq!(config.tools.exec.timeout_secs, 60);
        assert!(config.tools.exec.restrict_to_workspace);
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.gateway.port, 18790);
    }

    #[test]
    fn load_from_file_and_clamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"
[agent]
model = "gpt-4o-mini"
max_tool_iterations = 0

[gateway]
port = 9000
rate_limit_burst = 0
"#
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.agent.model, "gpt-4o-mini");
        // Zero values are clamped back to defaults
        assert_eq!(config.agent.max_tool_iterations, 20);
        assert_eq!(config.gateway.rate_limit_burst, 10);
        assert_eq!(config.gateway.port, 9000);
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig { api_key: Some("sk-secret".into()), api_base: None },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn tilde_expansion() {
        unsafe { std::env::set_var("HOME", "/home/tester") };
        assert_eq!(expand_tilde("~/ws"), "/home/tester/ws");
        assert_eq!(expand_tilde("/abs/path"), "/abs/path");
    }
}
