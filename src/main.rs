//! tvresearch - TV research pipeline
//!
//! Main entry point for the tvresearch CLI and server.

mod cli;
mod cmd_config;
mod cmd_run;
mod server;

use clap::Parser;
use tvresearch_config::{ConfigLoader, ConfigValidator};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    });

    if let Commands::CheckConfig = command {
        return cmd_config::check_config(&cli.config);
    }

    let config = ConfigLoader::load_or_default(&cli.config)?;
    server::init_tracing(&config.logging)?;

    let validation = ConfigValidator::validate(&config)?;
    for warning in &validation.warnings {
        tracing::warn!(path = %warning.path, "{}", warning.message);
    }
    validation.into_result()?;

    match command {
        Commands::Serve { host, port } => server::run_server(config, host, port).await,
        Commands::Run { topic, poll_secs } => cmd_run::run_once(config, topic, poll_secs).await,
        Commands::CheckConfig => Ok(()),
    }
}
