//! `ferrobot agent` — talk to the agent from the terminal.

use std::error::Error;
use std::io::Write;

use tokio_util::sync::CancellationToken;

use ferrobot_config::AppConfig;

use super::build_runtime;

pub async fn run(message: Option<String>, session: String) -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    let runtime = build_runtime(&config)?;
    let cancel = CancellationToken::new();

    if let Some(message) = message {
        let reply = runtime.agent.process_direct(&cancel, &message, &session).await?;
        println!("{reply}");
        return Ok(());
    }

    // Interactive mode: one line per turn, EOF or "exit" quits.
    println!("Ferrobot ready. Type a message, or \"exit\" to quit.\n");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        match runtime.agent.process_direct(&cancel, line, &session).await {
            Ok(reply) => println!("{reply}\n"),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    Ok(())
}
