use expense_copilot::MessageAgent;
use std::io::{self, BufRead, Write};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Expense Copilot starting");

    let agent = MessageAgent::from_env()?;
    let user_id = 1;

    println!("Expense Copilot ready. Type a message (/help for commands, Ctrl-D to quit).");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        match agent.handle_message(user_id, message).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => {
                eprintln!("pipeline error: {}", e);
                break;
            }
        }
    }

    Ok(())
}
