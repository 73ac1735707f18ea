/*
feedrelay - main.rs
This binary loads the feed list and starts the Rocket HTTP server serving `/api/feeds`.
*/

use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use feedrelay::server::launch_rocket;

#[derive(Parser, Debug)]
#[command(name = "feedrelay", about = "Relay a fixed set of RSS/Atom feeds as JSON")]
struct Args {
    /// Path to config.toml (merged over config.default.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = match Config::load_for_cli(args.config.as_deref()).await {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("failed to load configuration: {:#}", e);
            return Err(e);
        }
    };
    info!(
        feeds = config.feeds.len(),
        bind = %config.server.bind,
        port = config.server.port,
        "configuration loaded"
    );
    if config.feeds.is_empty() {
        info!("no feeds configured; /api/feeds will return an empty list");
    }

    if let Err(e) = launch_rocket(Arc::new(config)).await {
        error!(%e, "Rocket server failed");
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}
