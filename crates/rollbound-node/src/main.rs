//! `rollbound-node`: the development toolkit for the protocol core — config
//! loading, structured logging, and a local in-memory devnet loop. The
//! workspace's scoped-down analog of the teacher's `ioi-cli`; no RPC, no
//! peer-to-peer networking, no persistence (all out of scope).

mod config;
mod simulation;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use config::NodeConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "rollbound-node", version, about = "Development toolkit for the rollbound protocol core")]
struct Cli {
    /// Path to a TOML config file. Falls back to built-in defaults if omitted.
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a local, single-delegate devnet loop for a fixed number of blocks.
    Run,
    /// Prints the effective config (defaults merged with any `--config` file) as TOML.
    PrintConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => NodeConfig::load(path).with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };

    match cli.command {
        Commands::Run => {
            simulation::run(&config.constants, config.blocks_to_bake).context("devnet run failed")?;
        }
        Commands::PrintConfig => {
            println!("{}", toml::to_string_pretty(&config).context("serializing config")?);
        }
    }

    Ok(())
}
