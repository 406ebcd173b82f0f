//! Named exclusive locks arbitrated by the store.
//!
//! A lock is held while its key exists. [`LockManager::acquire`] is one
//! atomic set-if-absent, so among any number of concurrent callers exactly
//! one observes the key as absent and wins. There is no read-then-write
//! anywhere on the acquisition path.
//!
//! Two flavours share the same keys:
//!
//! - **Existence locks** ([`acquire`](LockManager::acquire) /
//!   [`release`](LockManager::release)) write a fixed sentinel. Anyone may
//!   release them; `release` reports only whether a key was removed.
//! - **Owned locks** ([`try_lock`](LockManager::try_lock)) write a random
//!   owner token and hand back a [`LockGuard`] whose release is a
//!   compare-and-delete, so a guard never removes a lock someone else holds.
//!
//! With [`LockConfig::ttl_secs`] set, held keys expire on their own and a
//! crashed holder cannot wedge the resource forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use keyward_store::{KeyValueStore, StoreError};

use crate::config::LockConfig;

/// Value written by [`LockManager::acquire`]. Only its presence matters.
pub const LOCK_SENTINEL: &str = "1";

/// Default interval between attempts in [`LockManager::acquire_within`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Grants named exclusive locks on a shared [`KeyValueStore`].
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn KeyValueStore>,
    config: LockConfig,
}

impl LockManager {
    /// Create a lock manager with no TTL and no key prefix.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(store, LockConfig::default())
    }

    pub fn with_config(store: Arc<dyn KeyValueStore>, config: LockConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    fn key(&self, name: &str) -> String {
        if self.config.key_prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{}:{name}", self.config.key_prefix)
        }
    }

    /// Attempt to take the lock once.
    ///
    /// Returns `true` iff this call created the lock key. Contention is
    /// `Ok(false)`; only store failures are errors.
    pub async fn acquire(&self, name: &str) -> Result<bool, StoreError> {
        let key = self.key(name);
        let acquired = self
            .store
            .set_if_absent(&key, LOCK_SENTINEL, self.config.ttl())
            .await?;
        debug!(lock = %key, acquired, "lock acquire");
        Ok(acquired)
    }

    /// Delete the lock key.
    ///
    /// Returns `true` iff a key was present and removed. Releasing a lock
    /// that is not held is `Ok(false)`. No ownership is checked.
    pub async fn release(&self, name: &str) -> Result<bool, StoreError> {
        let key = self.key(name);
        let released = self.store.delete(&key).await? > 0;
        debug!(lock = %key, released, "lock release");
        Ok(released)
    }

    /// Retry [`acquire`](Self::acquire) every `poll_interval` until it
    /// succeeds or `timeout` elapses.
    ///
    /// Returns `Ok(false)` if the deadline passes without acquiring. A
    /// timeout too large to represent, such as [`Duration::MAX`], waits
    /// without a deadline.
    pub async fn acquire_within(
        &self,
        name: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<bool, StoreError> {
        // `None` when the deadline lies past the end of the clock: wait forever.
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if self.acquire(name).await? {
                return Ok(true);
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(lock = name, ?timeout, "lock wait timed out");
                        return Ok(false);
                    }
                    poll_interval.min(deadline - now)
                }
                None => poll_interval,
            };
            tokio::time::sleep(pause).await;
        }
    }

    /// Attempt once to take an owned lock.
    ///
    /// Returns `None` if the lock is already held by anyone.
    pub async fn try_lock(&self, name: &str) -> Result<Option<LockGuard>, StoreError> {
        let key = self.key(name);
        let owner = Uuid::new_v4().to_string();
        let acquired = self
            .store
            .set_if_absent(&key, &owner, self.config.ttl())
            .await?;
        debug!(lock = %key, acquired, "owned lock acquire");

        Ok(acquired.then(|| LockGuard {
            store: Arc::clone(&self.store),
            key,
            owner,
        }))
    }
}

/// A lock taken with [`LockManager::try_lock`].
///
/// Dropping the guard does not release the lock; call
/// [`release`](Self::release), or rely on the configured TTL.
pub struct LockGuard {
    store: Arc<dyn KeyValueStore>,
    key: String,
    owner: String,
}

impl LockGuard {
    /// The store key backing this lock.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The owner token stored as the lock's value.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Check whether the lock key still carries this guard's owner token.
    pub async fn is_held(&self) -> Result<bool, StoreError> {
        let current = self.store.get(&self.key).await?;
        Ok(current.as_deref() == Some(self.owner.as_str()))
    }

    /// Release the lock if this guard still owns it.
    ///
    /// Returns `false` if the lock expired or was taken over in the meantime;
    /// the other holder's key is left untouched.
    pub async fn release(self) -> Result<bool, StoreError> {
        let released = self
            .store
            .delete_if_equals(&self.key, &self.owner)
            .await?;
        debug!(lock = %self.key, released, "owned lock release");
        Ok(released)
    }
}
