//! `ferrobot status` — configuration summary.

use std::error::Error;

use ferrobot_config::{AppConfig, expand_tilde};

pub fn run() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;

    println!("Ferrobot Status");
    println!("===============");
    println!("  Config dir:  {}", AppConfig::dir()?.display());
    println!("  Workspace:   {}", expand_tilde(&config.agent.workspace));
    println!("  Model:       {}", config.agent.model);
    println!("  Gateway:     {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  Rate limit:  {} rps, burst {}",
        config.gateway.rate_limit_rps, config.gateway.rate_limit_burst
    );
    println!(
        "  Exec tool:   {}s timeout, workspace confinement {}",
        config.tools.exec.timeout_secs,
        if config.tools.exec.restrict_to_workspace { "on" } else { "off" }
    );

    let configured: Vec<&str> = config
        .providers
        .iter()
        .filter(|(_, p)| p.api_key.is_some())
        .map(|(name, _)| name.as_str())
        .collect();
    if configured.is_empty() {
        println!("  Providers:   none configured — run `ferrobot onboard` and add an API key");
    } else {
        println!("  Providers:   {}", configured.join(", "));
    }

    let config_path = AppConfig::path()?;
    if config_path.exists() {
        println!("\n  Config file found at {}", config_path.display());
    } else {
        println!("\n  No config file — run `ferrobot onboard` first");
    }

    Ok(())
}
