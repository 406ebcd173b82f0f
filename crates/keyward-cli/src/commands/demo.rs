use std::sync::Arc;

use tracing::info;

use keyward::{LockManager, SessionManager};
use keyward_store::KeyValueStore;

use crate::config::KeywardConfig;

const DEMO_LOCK: &str = "lock";
const DEMO_PRINCIPAL: &str = "msk";

/// Take a lock twice and release it, then run one session through its
/// whole lifecycle, printing each outcome.
pub async fn run(store: Arc<dyn KeyValueStore>, config: &KeywardConfig) -> anyhow::Result<()> {
    let locks = LockManager::with_config(Arc::clone(&store), config.lock.clone());
    info!(lock = DEMO_LOCK, "lock walkthrough");
    println!("acquire: {}", locks.acquire(DEMO_LOCK).await?);
    println!("acquire: {}", locks.acquire(DEMO_LOCK).await?);
    println!("release: {}", locks.release(DEMO_LOCK).await?);

    let session = SessionManager::new(store, DEMO_PRINCIPAL).with_config(config.session.clone());
    info!(principal = DEMO_PRINCIPAL, "session walkthrough");
    let token = session.create_token().await?;
    println!("token: {token}");
    println!(
        "validate wrong token: {}",
        session.validate_token("WRONG_TOKEN").await?
    );
    println!("validate token: {}", session.validate_token(&token).await?);
    session.destroy().await?;
    println!(
        "validate after destroy: {}",
        session.validate_token(&token).await?
    );
    Ok(())
}
