//! # CLI Interface
//!
//! Defines the command-line argument structure for `vesting-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `check`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Vesting ledger node.
///
/// Serves a token ledger with vesting locks over HTTP, streams transfer
/// events over WebSocket, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "vesting-node",
    about = "Vesting ledger node",
    version,
    propagate_version = true
)]
pub struct VestingNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Write a default ledger config file.
    Init(InitArgs),
    /// Validate a ledger config file and print its genesis summary.
    Check(CheckArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the ledger config file (JSON).
    ///
    /// When omitted, the node starts with the default devnet token and an
    /// empty genesis.
    #[arg(long, short = 'c', env = "VESTING_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address for the REST and WebSocket API.
    #[arg(long, env = "VESTING_LISTEN", default_value = "0.0.0.0:9841")]
    pub listen: String,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VESTING_METRICS_PORT", default_value_t = 9842)]
    pub metrics_port: u16,

    /// Log output format.
    #[arg(long, env = "VESTING_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the config file.
    #[arg(long, short = 'c', env = "VESTING_CONFIG", default_value = "vesting.json")]
    pub config: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Config file to validate.
    #[arg(long, short = 'c', env = "VESTING_CONFIG")]
    pub config: PathBuf,
}
