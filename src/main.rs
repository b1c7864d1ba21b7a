//! Main entry point for the DeepL gateway CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deepl_gateway::cli::commands::{self, Commands};
use deepl_gateway::GatewayConfig;

/// DeepL Gateway - translate text and documents over HTTP
#[derive(Parser, Debug)]
#[command(name = "deepl-gateway", version, about, long_about = None)]
struct Args {
    /// Default API key (optional, defaults to DEEPL_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Configuration file (toml, json or yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("deepl_gateway={},tower_http={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = GatewayConfig::load(args.config.as_deref())?;

    // Override config with CLI args if provided
    if let Some(api_key) = args.api_key.filter(|key| !key.trim().is_empty()) {
        config.api_key = Some(api_key);
    }

    // Execute command
    match args.command {
        Some(Commands::Serve {
            host,
            port,
            scratch_dir,
        }) => {
            commands::handle_serve(config, host, port, scratch_dir).await?;
        }
        Some(Commands::Translate {
            text,
            target_lang,
            source_lang,
        }) => {
            commands::handle_translate(config, text, target_lang, source_lang).await?;
        }
        Some(Commands::Usage) => {
            commands::handle_usage(config).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
