/*
 * Operator diagnostic: run one fetch of every configured feed and print what the
 * endpoint would serve, plus the sniffed dialect of each body.
 */

use anyhow::Result;
use clap::Parser;
use common::Config;
use std::path::PathBuf;

use feedrelay::{extraction, ingestion};

#[derive(Parser, Debug)]
#[command(name = "probe_feeds", about = "Fetch every configured feed once and print the items")]
struct Args {
    /// Path to config.toml (merged over config.default.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Items to show per feed (defaults to limits.default_count)
    #[arg(long)]
    count: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::load_for_cli(args.config.as_deref()).await?;
    let limit = args
        .count
        .unwrap_or(config.limits.default_count)
        .clamp(1, config.limits.max_count);
    let client = ingestion::build_client(&config.fetch)?;

    for feed in &config.feeds {
        println!("\n{}", "=".repeat(60));
        println!("{} <{}>", feed.name, feed.url);
        println!("{}", "=".repeat(60));

        match ingestion::fetch_feed_text(&client, &feed.url).await {
            Ok(body) => {
                let items = extraction::extract(&body, limit);
                println!(
                    "✓ {} ({} bytes), showing {}",
                    extraction::sniff_dialect(&body),
                    body.len(),
                    items.len()
                );
                for (i, item) in items.iter().enumerate() {
                    println!("  {}. {}", i + 1, item.title);
                    println!("     {}", item.link);
                    println!("     {}", item.date);
                }
            }
            Err(e) => println!("✗ Failed: {:#}", e),
        }
    }

    Ok(())
}
