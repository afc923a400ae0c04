//! scrapegated - the scrapegate daemon.
//!
//! Single binary that assembles:
//! - Configuration (scrapegate.toml)
//! - Producer table (built-in producers + static metrics)
//! - Access gate (per-tag tokens)
//! - HTTP API serving `/{tag}/metrics`
//!
//! # Usage
//!
//! ```text
//! scrapegated serve --config /etc/scrapegate/scrapegate.toml
//! scrapegated init > scrapegate.toml
//! ```

mod producers;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use scrapegate_api::{AccessGate, StaticSecrets};
use scrapegate_core::ScrapegateConfig;
use scrapegate_metrics::Collector;

#[derive(Parser)]
#[command(name = "scrapegated", about = "scrapegate daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the exposition endpoint.
    Serve {
        /// Path to scrapegate.toml.
        #[arg(long, default_value = "scrapegate.toml")]
        config: PathBuf,

        /// Override `server.listen` from the config file.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Print a starter config to stdout.
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve { config, listen } => run_serve(config, listen).await,
        Command::Init => {
            print!("{}", ScrapegateConfig::scaffold().to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,scrapegated=debug,scrapegate=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_serve(config_path: PathBuf, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    info!(path = ?config_path, "scrapegate daemon starting");

    // ── Configuration ──────────────────────────────────────────

    let config = ScrapegateConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let secrets = config.resolve_secrets(|var| std::env::var(var).ok())?;
    if secrets.is_empty() {
        tracing::warn!("no scopes configured, every scrape will be rejected");
    }
    info!(scopes = secrets.len(), "access scopes loaded");

    // ── Producers ──────────────────────────────────────────────

    let producers = producers::build_producers(&config);
    let mut collector = Collector::new(producers);
    if let Some(timeout) = config.collection.producer_timeout() {
        collector = collector.with_timeout(timeout);
    }
    info!(
        producers = ?collector.producer_names(),
        producer_timeout = ?config.collection.producer_timeout(),
        "collector initialized"
    );

    // ── API server ─────────────────────────────────────────────

    let gate = AccessGate::new(StaticSecrets::new(secrets));
    let router = scrapegate_api::build_router(gate, collector);
    let addr = listen.unwrap_or(config.server.listen);

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                return;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("scrapegate daemon stopped");
    Ok(())
}
