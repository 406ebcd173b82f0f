use std::sync::Arc;

use clap::{Args, Subcommand};

use keyward::SessionManager;
use keyward_store::KeyValueStore;

use crate::OutputFormat;
use crate::config::KeywardConfig;

#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Issue a new token, replacing any existing session.
    Create {
        /// Principal (e.g. user id).
        principal: String,
        /// Session lifetime in seconds (defaults to the configured value).
        #[arg(long, allow_negative_numbers = true)]
        timeout_secs: Option<i64>,
    },
    /// Check a token. Exits with status 2 unless the token is valid.
    Validate {
        /// Principal (e.g. user id).
        principal: String,
        /// Token to check.
        token: String,
    },
    /// Revoke the principal's session.
    Destroy {
        /// Principal (e.g. user id).
        principal: String,
    },
}

pub async fn run(
    store: Arc<dyn KeyValueStore>,
    config: &KeywardConfig,
    args: &SessionArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let principal = match &args.command {
        SessionCommand::Create { principal, .. }
        | SessionCommand::Validate { principal, .. }
        | SessionCommand::Destroy { principal } => principal,
    };
    let session = SessionManager::new(store, principal.as_str()).with_config(config.session.clone());

    match &args.command {
        SessionCommand::Create { timeout_secs, .. } => {
            let token = match timeout_secs {
                Some(secs) => session.create_token_with_timeout(*secs).await?,
                None => session.create_token().await?,
            };
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "principal": principal, "token": token })
                ),
                OutputFormat::Text => println!("{token}"),
            }
        }
        SessionCommand::Validate { token, .. } => {
            let status = session.validate_token(token).await?;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "principal": principal, "status": status })
                ),
                OutputFormat::Text => println!("{status}"),
            }
            if !status.is_valid() {
                std::process::exit(2);
            }
        }
        SessionCommand::Destroy { .. } => {
            session.destroy().await?;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "principal": principal, "destroyed": true })
                ),
                OutputFormat::Text => println!("Session for {principal} destroyed."),
            }
        }
    }
    Ok(())
}
