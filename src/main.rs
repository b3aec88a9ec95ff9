use std::io::Write;

use anyhow::Context;
use clap::{Parser, Subcommand};
use oai_rt_console::sdk::chat;
use oai_rt_console::{Config, ConsoleBuilder, RestClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const GREETING: &str = "Oh, hey there! What's on your mind?";

#[derive(Parser)]
#[command(name = "oai-rt-console", version, about = "Realtime tool console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the realtime API and render tool calls. Lines typed on stdin are sent as user messages.
    Run {
        #[arg(long, default_value = GREETING)]
        greeting: String,
    },
    /// Stream a one-off chat completion to stdout.
    Chat { prompt: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Run { greeting } => run(config, greeting).await,
        Commands::Chat { prompt } => run_chat(&config, &prompt).await,
    }
}

async fn run(config: Config, greeting: String) -> anyhow::Result<()> {
    let console = ConsoleBuilder::new()
        .config(config)
        .greeting(greeting)
        .connect_ws()
        .await
        .context("Failed to connect to the realtime API")?;
    console.set_session_active(true).await?;

    let mut views = console.views();
    println!("{}", *views.borrow_and_update());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", *views.borrow_and_update());
            }
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(text) if !text.trim().is_empty() => {
                        console.say(text.trim()).await?;
                        console.respond().await?;
                    }
                    Some(_) => {}
                    None => break,
                }
            }
        }
    }

    let _ = console.stop().await;
    Ok(())
}

async fn run_chat(config: &Config, prompt: &str) -> anyhow::Result<()> {
    let client = RestClient::new(&config.base_url, &config.api_key)?;
    chat::stream_completion(&client, &config.chat_model, prompt, |delta| {
        print!("{delta}");
        let _ = std::io::stdout().flush();
    })
    .await
    .context("Chat completion failed")?;
    println!();
    Ok(())
}
