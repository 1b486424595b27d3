// relayctl - send commands to a running relay hub.

use std::io::{self, BufRead, Write};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "relayctl")]
#[command(about = "Send commands to the relay hub trigger endpoint")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "RELAY_TRIGGER_URL",
        default_value = "http://127.0.0.1:8081/send-command",
        help = "Relay trigger endpoint"
    )]
    pub url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Send a single command and exit")]
    Send { command: String },

    #[command(about = "Read commands from stdin and send each line")]
    Repl,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Send { command } => send(&client, &cli.url, &command).await,
        Commands::Repl => repl(&client, &cli.url).await,
    }
}

async fn repl(client: &reqwest::Client, url: &str) -> anyhow::Result<()> {
    println!("Connected to: {}", url);
    println!("Type a command and press Enter ('exit' or 'quit' to leave)");

    let stdin = io::stdin();
    loop {
        print!(">> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if matches!(command, "exit" | "quit" | "q") {
            break;
        }

        if let Err(err) = send(client, url, command).await {
            eprintln!("✗ {err}");
        }
    }
    Ok(())
}

async fn send(client: &reqwest::Client, url: &str, command: &str) -> anyhow::Result<()> {
    let response = client
        .post(url)
        .json(&json!({ "command": command }))
        .send()
        .await
        .context("could not reach the relay hub")?;

    let status = response.status();
    let body: Value = response.json().await.unwrap_or_else(|_| json!({}));

    if status.is_success() {
        println!(
            "✓ delivered to {} client(s)",
            body.get("clients").cloned().unwrap_or_else(|| json!(0))
        );
    } else {
        anyhow::bail!("relay answered {}: {}", status, body);
    }
    Ok(())
}
