//! `grid-server` binary: seeds the store and serves the grid over HTTP

use anyhow::Context;
use clap::Parser;
use grid_server::telemetry::init_tracing;
use grid_server::{bind, AppState, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Serve the live inventory grid
#[derive(Debug, Parser)]
#[command(name = "grid-server", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Number of seeded rows, overriding the config file
    #[arg(long)]
    seed_rows: Option<usize>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing("info", cli.log_json);

    let mut config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(addr) = cli.bind {
        config = config.with_bind(addr);
    }
    if let Some(rows) = cli.seed_rows {
        config = config.with_seed_rows(rows);
    }
    config.validate()?;

    let state = AppState::from_config(&config);
    let (addr, server) = bind(state, config.bind, async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("ctrl-c handler unavailable; running until killed");
            std::future::pending::<()>().await;
        }
    })
    .with_context(|| format!("binding {}", config.bind))?;

    tracing::info!(%addr, rows = config.seed_rows, "grid server listening");
    server.await;
    tracing::info!("grid server stopped");
    Ok(())
}
