// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tether - a multi-channel customer-engagement relay.
//!
//! This is the binary entry point for the relay daemon and its operator
//! commands.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod serve;
mod shutdown;
mod status;

/// Tether - a multi-channel customer-engagement relay.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay: connect accounts and run the dispatch pipeline.
    Serve,
    /// Show per-account connection status from the local store.
    Status,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match tether_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            tether_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.relay.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Some(Commands::Serve) => serve::run(config).await,
        Some(Commands::Status) => status::run(config).await,
        Some(Commands::Config) => {
            match toml::to_string_pretty(&config) {
                Ok(rendered) => {
                    println!("{rendered}");
                    Ok(())
                }
                Err(e) => Err(tether_core::TetherError::Internal(format!(
                    "failed to render config: {e}"
                ))),
            }
        }
        None => {
            println!("tether: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("tether: {e}");
        std::process::exit(1);
    }
}
