// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vesting Ledger Node
//!
//! Entry point for the `vesting-node` binary. Parses CLI arguments,
//! initializes logging and metrics, builds the ledger from its config, and
//! serves the HTTP/WS API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — start the node
//! - `init`    — write a default ledger config
//! - `check`   — validate a ledger config
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use vesting_ledger::config::LEDGER_VERSION;
use vesting_ledger::{LedgerConfig, SystemClock};

use cli::{Commands, VestingNodeCli};
use logging::LogFormat;
use metrics::LedgerMetrics;

/// Broadcast channel capacity for live event streaming.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VestingNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_config(args),
        Commands::Check(args) => check_config(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Reads `path` or falls back to the default devnet config.
fn load_config(path: Option<&Path>) -> Result<LedgerConfig> {
    match path {
        Some(path) => LedgerConfig::load(path)
            .with_context(|| format!("failed to load ledger config from {}", path.display())),
        None => {
            tracing::warn!("no config given, starting with an empty devnet genesis");
            Ok(LedgerConfig::default())
        }
    }
}

/// Starts the node: API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.log_format);

    tracing::info!(
        listen = %args.listen,
        metrics_port = args.metrics_port,
        "starting vesting-node"
    );

    let config = load_config(args.config.as_deref())?;

    // --- Metrics ---
    let ledger_metrics = Arc::new(LedgerMetrics::new());

    // --- Ledger + application state ---
    let app_state = api::AppState::from_config(
        &config,
        Arc::new(SystemClock),
        Arc::clone(&ledger_metrics),
        format!("{} (ledger {})", env!("CARGO_PKG_VERSION"), LEDGER_VERSION),
        EVENT_CHANNEL_CAPACITY,
    )
    .context("invalid ledger config")?;

    let supply = app_state.ledger.read(|l| l.total_supply());
    tracing::info!(
        symbol = %config.token.symbol,
        total_supply = supply,
        genesis_accounts = config.genesis.len(),
        "ledger ready"
    );

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind API listener on {}", args.listen))?;
    tracing::info!("API server listening on {}", args.listen);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&ledger_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("vesting-node stopped");
    Ok(())
}

/// Writes the default ledger config to `args.config`.
fn init_config(args: cli::InitArgs) -> Result<()> {
    let path = &args.config;
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    logging::init_logging("vesting_node=info", LogFormat::Pretty);

    let json = render_default_config()?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write config to {}", path.display()))?;
    tracing::info!(path = %path.display(), "default config written");

    println!("Config written to {}", path.display());
    println!("Add genesis allocations before running a node.");
    Ok(())
}

fn render_default_config() -> Result<String> {
    serde_json::to_string_pretty(&LedgerConfig::default()).context("failed to encode config")
}

/// Validates a config file and prints its genesis summary.
fn check_config(args: cli::CheckArgs) -> Result<()> {
    let config = LedgerConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let supply = config
        .validate()
        .with_context(|| format!("{} is invalid", args.config.display()))?;

    println!("Config OK: {}", args.config.display());
    println!("  Token          : {} ({})", config.token.name, config.token.symbol);
    println!("  Decimals       : {}", config.token.decimals);
    println!("  Genesis        : {} accounts", config.genesis.len());
    println!("  Total supply   : {}", supply);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("vesting-node {}", env!("CARGO_PKG_VERSION"));
    println!("ledger       {}", LEDGER_VERSION);
    println!("rustc        {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vesting.json");
        std::fs::write(&path, render_default_config().unwrap()).unwrap();

        let loaded = load_config(Some(path.as_path())).unwrap();
        assert_eq!(loaded, LedgerConfig::default());
        assert_eq!(loaded.validate().unwrap(), 0);
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vesting.json");
        std::fs::write(&path, "{}").unwrap();

        let err = init_config(cli::InitArgs {
            config: path.clone(),
            force: false,
        })
        .unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn check_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_config(cli::CheckArgs {
            config: dir.path().join("absent.json"),
        })
        .unwrap_err();
        assert!(err.to_string().contains("failed to load"));
    }
}
