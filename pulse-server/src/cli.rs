use std::path::PathBuf;

use clap::Parser;

/// Pulse realtime market-data engine.
#[derive(Debug, Parser)]
#[command(name = "pulse-server", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short = 'c', default_value = "pulse.toml")]
    pub config: PathBuf,

    /// Override the `tracing-subscriber` env filter (e.g. `pulse_engine=debug`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to the line-oriented watchlist file, overriding config.
    #[arg(long)]
    pub watchlist: Option<PathBuf>,
}
