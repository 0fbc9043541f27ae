//! `ferrobot onboard` — first-time setup.

use std::error::Error;
use std::path::Path;

use ferrobot_config::{AppConfig, expand_tilde};

pub fn run() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::default();
    let config_dir = AppConfig::dir()?;
    let workspace = expand_tilde(&config.agent.workspace);

    println!("Ferrobot — First-Time Setup");
    println!("===========================\n");

    scaffold(&config_dir, Path::new(&workspace), &config)?;

    println!("\nNext steps:");
    println!("  1. Edit {} and add your API key", config_dir.join("config.toml").display());
    println!("  2. Run: ferrobot agent -m \"hello\"");
    println!("  3. Or start the gateway: ferrobot gateway\n");

    Ok(())
}

/// Create the config directory, workspace scaffold, and default
/// bootstrap documents. Existing files are never overwritten.
fn scaffold(config_dir: &Path, workspace: &Path, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(config_dir)?;
    for sub in ["memory", "skills", "sessions"] {
        std::fs::create_dir_all(workspace.join(sub))?;
    }
    println!("Workspace ready at {}", workspace.display());

    let bootstrap: [(&str, &str); 3] = [
        (
            "AGENTS.md",
            concat!(
                "# Agent Instructions\n\n",
                "You are Ferrobot, a personal assistant with access to tools\n",
                "(shell, file read/write/edit, directory listing). Use them\n",
                "proactively when they help accomplish the task.\n",
            ),
        ),
        (
            "SOUL.md",
            concat!(
                "# Personality & Tone\n\n",
                "- Be concise and direct\n",
                "- Ask for clarification when the request is ambiguous\n",
                "- Be honest about limitations\n",
            ),
        ),
        (
            "USER.md",
            concat!(
                "# User Context\n\n",
                "<!-- Add information about yourself that the agent should know -->\n",
            ),
        ),
    ];
    for (name, content) in bootstrap {
        let path = workspace.join(name);
        if !path.exists() {
            std::fs::write(&path, content)?;
            println!("Created {name}");
        }
    }

    let memory_path = workspace.join("memory").join("MEMORY.md");
    if !memory_path.exists() {
        std::fs::write(&memory_path, "# Memory\n\n<!-- Long-term notes live here -->\n")?;
    }

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!("Config already exists at {}, leaving it alone", config_path.display());
    } else {
        std::fs::write(&config_path, config.to_toml())?;
        println!("Created {}", config_path.display());
    }

    Ok(())
}
