//! Ferrobot CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Initialize config & workspace
//! - `agent`    — Interactive chat or single-message mode
//! - `gateway`  — Start the HTTP gateway, bus, and channels
//! - `status`   — Show configuration summary

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ferrobot", about = "Ferrobot — a personal assistant agent", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and workspace
    Onboard,

    /// Chat with the agent
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Session key ("channel:chat_id")
        #[arg(short, long, default_value = "cli:default")]
        session: String,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show configuration summary
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run()?,
        Commands::Agent { message, session } => commands::agent::run(message, session).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Status => commands::status::run()?,
    }

    Ok(())
}
