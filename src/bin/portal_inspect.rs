use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use librus_relay::classify::classify;
use librus_relay::config;
use librus_relay::portal::{LibrusClient, Portal};

/// Print the pending change batch without acknowledging it.
#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Also fetch and print each notice subject
    #[arg(long)]
    resolve: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = config::load(Some(&args.config))?;
    let client = LibrusClient::from_config(&cfg)?;

    let changes = client.fetch_changes().await?;
    println!("Pending changes: {}", changes.len());
    for change in &changes {
        println!(
            "  {} -> {{ resource: {} {}, operation: {:?}, handling: {:?} }}",
            change.id,
            change.resource_type.as_str(),
            change.resource_id,
            change.operation,
            classify(change)
        );
        if args.resolve {
            if let librus_relay::model::ResourceType::SchoolNotice = change.resource_type {
                match client.fetch_notice(&change.resource_id).await {
                    Ok(notice) => println!("      subject: {}", notice.subject),
                    Err(err) => println!("      unavailable: {err}"),
                }
            }
        }
    }
    Ok(())
}
