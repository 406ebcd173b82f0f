//! Keyward CLI
//!
//! Take and release named locks, and issue, check and revoke session tokens
//! against the configured key-value store.

mod commands;
mod config;
mod store_factory;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::KeywardConfig;

/// Keyward CLI — distributed locks and session tokens on a shared store.
#[derive(Parser, Debug)]
#[command(name = "keyward", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        env = "KEYWARD_CONFIG",
        default_value = "keyward.toml",
        global = true
    )]
    config: PathBuf,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Acquire and release named locks.
    ///
    /// Locks only outlive this command on a shared backend. With the default
    /// `memory` backend every run starts from an empty store; set
    /// `backend = "redis"` under `[store]` in the config file.
    Lock(commands::lock::LockArgs),
    /// Create, validate and destroy session tokens.
    ///
    /// Sessions only outlive this command on a shared backend. With the
    /// default `memory` backend a token created in one run is unknown to the
    /// next; set `backend = "redis"` under `[store]` in the config file.
    Session(commands::session::SessionArgs),
    /// Walk through the lock and session flows end to end.
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = KeywardConfig::load(&cli.config)?;
    let store = store_factory::create_store(&config.store)?;

    if !config.store.is_shared() && !matches!(cli.command, Command::Demo) {
        warn!(
            backend = %config.store.backend,
            "store is local to this process; nothing will persist after it exits"
        );
    }

    match cli.command {
        Command::Lock(args) => commands::lock::run(store, &config, &args, &cli.format).await,
        Command::Session(args) => {
            commands::session::run(store, &config, &args, &cli.format).await
        }
        Command::Demo => commands::demo::run(store, &config).await,
    }
}
