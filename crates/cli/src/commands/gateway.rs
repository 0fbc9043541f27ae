//! `ferrobot gateway` — the long-running service.
//!
//! Wires the whole runtime together: message bus, agent loop, channel
//! adapters, timeline database, and the HTTP surface. A single
//! cancellation token fans out to every component; Ctrl+C or SIGTERM
//! trips it and the gateway drains within the configured window.

use std::error::Error;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use ferrobot_channels::{ChannelRegistry, LocalChannel};
use ferrobot_config::AppConfig;
use ferrobot_gateway::GatewayState;
use ferrobot_timeline::TimelineService;

use super::build_runtime;

pub async fn run(port: Option<u16>) -> Result<(), Box<dyn Error>> {
    let mut config = AppConfig::load()?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let runtime = build_runtime(&config)?;
    let cancel = CancellationToken::new();

    let timeline_path = AppConfig::dir()?.join("timeline.db");
    let timeline = Arc::new(TimelineService::new(&timeline_path.to_string_lossy()).await?);

    // Channels: the local adapter is always on; configured adapters are
    // registered when enabled.
    let mut channels = ChannelRegistry::new();
    let local_allow = config
        .channels
        .get("local")
        .map(|c| c.allow_from.clone())
        .unwrap_or_default();
    channels.register(Arc::new(LocalChannel::new(local_allow)));
    for (name, channel_config) in &config.channels {
        if channel_config.enabled && name != "local" {
            info!(channel = %name, "No adapter built in for this channel, skipping");
        }
    }
    channels.attach_to_bus(&runtime.bus);
    channels.start_all(cancel.clone());

    // Bus dispatcher and agent loop run for the lifetime of the token.
    {
        let bus = runtime.bus.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { bus.dispatch_outbound(cancel).await });
    }
    {
        let agent = runtime.agent.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = agent.run(cancel.clone()).await {
                error!(error = %e, "Agent loop failed");
                cancel.cancel();
            }
        });
    }

    let state = Arc::new(GatewayState::new(
        runtime.agent.clone(),
        timeline.clone(),
        cancel.clone(),
    ));
    state.mark_ready();

    spawn_signal_handler(cancel.clone());

    info!(workspace = %runtime.workspace.display(), "Gateway running, press Ctrl+C to stop");
    ferrobot_gateway::serve(config.gateway.clone(), state, cancel.clone()).await?;

    channels.stop_all().await;
    timeline.close().await;
    info!("Gateway stopped");
    Ok(())
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut term =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("SIGTERM handler installation failed");
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        info!("Shutdown signal received");
        cancel.cancel();
    });
}
