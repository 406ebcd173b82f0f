use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};

use keyward::LockManager;
use keyward::lock::DEFAULT_POLL_INTERVAL;
use keyward_store::KeyValueStore;

use crate::OutputFormat;
use crate::config::KeywardConfig;

#[derive(Args, Debug)]
pub struct LockArgs {
    #[command(subcommand)]
    pub command: LockCommand,
}

#[derive(Subcommand, Debug)]
pub enum LockCommand {
    /// Try to take a lock.
    Acquire {
        /// Lock name.
        key: String,
        /// Expire the lock after this many seconds (overrides config).
        #[arg(long)]
        ttl_secs: Option<NonZeroU64>,
        /// Keep retrying for up to this many milliseconds.
        #[arg(long)]
        wait_ms: Option<u64>,
    },
    /// Release a lock, whoever holds it.
    Release {
        /// Lock name.
        key: String,
    },
}

pub async fn run(
    store: Arc<dyn KeyValueStore>,
    config: &KeywardConfig,
    args: &LockArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    match &args.command {
        LockCommand::Acquire {
            key,
            ttl_secs,
            wait_ms,
        } => {
            let mut lock_config = config.lock.clone();
            if ttl_secs.is_some() {
                lock_config.ttl_secs = *ttl_secs;
            }
            let locks = LockManager::with_config(store, lock_config);

            let acquired = match wait_ms {
                Some(ms) => {
                    locks
                        .acquire_within(key, Duration::from_millis(*ms), DEFAULT_POLL_INTERVAL)
                        .await?
                }
                None => locks.acquire(key).await?,
            };

            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "lock": key, "acquired": acquired })
                ),
                OutputFormat::Text if acquired => println!("Acquired lock {key}."),
                OutputFormat::Text => println!("Lock {key} is already held."),
            }
        }
        LockCommand::Release { key } => {
            let locks = LockManager::with_config(store, config.lock.clone());
            let released = locks.release(key).await?;

            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "lock": key, "released": released })
                ),
                OutputFormat::Text if released => println!("Released lock {key}."),
                OutputFormat::Text => println!("Lock {key} was not held."),
            }
        }
    }
    Ok(())
}
