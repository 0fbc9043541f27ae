//! Command implementations plus the wiring shared between them.

pub mod agent;
pub mod gateway;
pub mod onboard;
pub mod status;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use ferrobot_agent::{AgentLoop, AgentLoopOptions};
use ferrobot_bus::MessageBus;
use ferrobot_config::{AppConfig, expand_tilde};
use ferrobot_core::Provider;
use ferrobot_providers::OpenAiCompatProvider;
use ferrobot_session::SessionStore;

/// Everything the `agent` and `gateway` commands share.
pub(crate) struct Runtime {
    pub bus: Arc<MessageBus>,
    pub agent: Arc<AgentLoop>,
    pub workspace: PathBuf,
}

pub(crate) fn build_runtime(config: &AppConfig) -> Result<Runtime, Box<dyn Error>> {
    let workspace = PathBuf::from(expand_tilde(&config.agent.workspace));
    std::fs::create_dir_all(&workspace)?;

    let bus = Arc::new(MessageBus::new());
    let provider = build_provider(config)?;
    let registry = Arc::new(ferrobot_tools::default_registry(
        &workspace,
        config.tools.exec.timeout(),
        config.tools.exec.restrict_to_workspace,
    ));
    let sessions = Arc::new(SessionStore::new(&workspace));

    let agent = Arc::new(AgentLoop::new(AgentLoopOptions {
        bus: bus.clone(),
        provider,
        registry,
        sessions,
        workspace: workspace.clone(),
        model: config.agent.model.clone(),
        max_tokens: config.agent.max_tokens,
        temperature: config.agent.temperature,
        max_iterations: config.agent.max_tool_iterations,
    }));

    Ok(Runtime { bus, agent, workspace })
}

/// Pick the first configured provider, preferring well-known names.
pub(crate) fn build_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, Box<dyn Error>> {
    // Deterministic preference order regardless of map iteration.
    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();
    names.sort_by_key(|n| match n.as_str() {
        "openai" => 0,
        "groq" => 1,
        _ => 2,
    });

    for name in names {
        let pc = &config.providers[name];
        let Some(api_key) = pc.api_key.clone() else { continue };
        let provider = match (&pc.api_base, name.as_str()) {
            (Some(base), _) => OpenAiCompatProvider::new((*name).clone(), base.clone(), api_key)?,
            (None, "groq") => OpenAiCompatProvider::groq(api_key)?,
            _ => OpenAiCompatProvider::openai(api_key)?,
        };
        return Ok(Arc::new(provider));
    }

    Err("No provider configured. Add an api_key under [providers.openai] \
         or set FERROBOT_OPENAI_API_KEY."
        .into())
}
