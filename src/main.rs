//! Entry point for the `mcp` binary.
//!
//! Sets up tracing on stderr, parses arguments, builds the manager and races
//! the chosen command against Ctrl-C.

use anyhow::Context;
use clap::Parser;
use mcp_manager::McpManager;
use mcp_manager::cli::Cli;
use mcp_manager::cli::commands::CommandHandler;
use mcp_manager::config::Paths;
use mcp_manager::constants::{EXIT_FAILURE, EXIT_INTERRUPTED};
use mcp_manager::error::Error;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_FAILURE
        }
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let paths = Paths::resolve(cli.config_dir).context("Failed to locate configuration directory")?;
    let manager = McpManager::from_paths(paths).context("Failed to initialize manager")?;
    let handler = CommandHandler::new(manager);

    tokio::select! {
        code = handler.dispatch(cli.command) => Ok(code),
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("Interrupted by user");
            eprintln!("\n{}", Error::Interrupted);
            Ok(EXIT_INTERRUPTED)
        }
    }
}
