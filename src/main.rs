use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use librus_relay::chat::DiscordClient;
use librus_relay::config;
use librus_relay::ops::OpsLog;
use librus_relay::portal::LibrusClient;
use librus_relay::relay;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    let portal = LibrusClient::from_config(&cfg).context("failed to build portal client")?;
    let chat = DiscordClient::from_config(&cfg).context("failed to build Discord client")?;
    let ops = OpsLog::new(cfg.discord.debug_channel_id.clone());

    let mut state = relay::register_channels(&chat, &ops, &cfg.channels)
        .await
        .context("failed to register channels")?;
    info!(channels = state.channels.len(), "starting relay loop");

    relay::run(&portal, &chat, &ops, &mut state, &cfg.app.timing()).await;
    Ok(())
}
