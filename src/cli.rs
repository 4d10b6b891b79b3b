//! CLI definitions for tvresearch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// tvresearch CLI.
#[derive(Parser)]
#[command(name = "tvresearch")]
#[command(about = "Four-stage TV research pipeline")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Serve the HTTP API and run all stage workers (default)
    Serve {
        /// Server host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a single research workflow to completion and print the report
    Run {
        /// Research focus; omit for general trending topics
        #[arg(long)]
        topic: Option<String>,

        /// Seconds between status polls
        #[arg(long, default_value_t = 1)]
        poll_secs: u64,
    },

    /// Load and validate the configuration file
    CheckConfig,
}
