use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Exchange-rate and aggregation reports over the ledger's markets.
#[derive(Debug, Parser)]
#[command(name = "ledgerfx", version, about)]
pub struct Cli {
    /// Gateway registry JSON file; the built-in demo registry is used
    /// when omitted.
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    /// Pretty-print the report JSON.
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Exchange rates for the requested currency pairs.
    Rates(RequestArgs),
    /// Trading volume across the known markets, normalized into one
    /// currency.
    Markets(RequestArgs),
    /// Total network value at a point in time.
    Value(RequestArgs),
}

#[derive(Debug, Args)]
pub struct RequestArgs {
    /// JSON request body; read from stdin when omitted. An empty body
    /// selects the defaults.
    #[arg(long)]
    pub request: Option<String>,
}
