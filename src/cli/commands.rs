//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::PathBuf;
use tracing::info;

use crate::core::backend::TranslationBackend;
use crate::core::client::DeepLClient;
use crate::core::config::GatewayConfig;

/// Commands for the DeepL gateway
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Bind address (default: 127.0.0.1)
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Listen port (default: 8080)
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Directory for uploads and translated files
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
    },

    /// Translate a piece of text and print the result
    Translate {
        /// Text to translate
        #[arg(long)]
        text: String,

        /// Target language (default: EN-US)
        #[arg(short, long, default_value = "EN-US")]
        target_lang: String,

        /// Source language (auto-detect if not specified)
        #[arg(long)]
        source_lang: Option<String>,
    },

    /// Print the character usage of the configured key
    Usage,
}

fn client_for(config: &GatewayConfig) -> anyhow::Result<DeepLClient> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DEEPL_API_KEY or --api-key is required"))?;
    Ok(DeepLClient::new(api_key, config)?)
}

/// Handle server command
pub async fn handle_serve(
    mut config: GatewayConfig,
    host: String,
    port: u16,
    scratch_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    use crate::server::api::run_server;

    if let Some(dir) = scratch_dir {
        config.scratch_dir = dir;
    }

    info!("Starting HTTP server on {}:{}", host, port);
    println!("🚀 Server starting on http://{}:{}", host, port);
    println!("📄 OpenAPI document: http://{}:{}/api-docs/openapi.json", host, port);

    run_server(config, host, port).await
}

/// Handle one-shot text translation
pub async fn handle_translate(
    config: GatewayConfig,
    text: String,
    target_lang: String,
    source_lang: Option<String>,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("No text provided");
    }

    let client = client_for(&config)?;
    let result = client
        .translate_text(&text, &target_lang, source_lang.as_deref())
        .await?;

    info!("Detected source language: {}", result.detected_source_lang);
    println!("{}", result.text);

    Ok(())
}

/// Handle usage command
pub async fn handle_usage(config: GatewayConfig) -> anyhow::Result<()> {
    let client = client_for(&config)?;
    let usage = client.get_usage().await?;

    println!("📊 Characters used: {}", usage.character_count);
    println!("   Character limit: {}", usage.character_limit);
    println!("   Remaining: {}", usage.remaining());

    Ok(())
}
