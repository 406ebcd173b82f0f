use std::num::NonZeroU64;
use std::time::Duration;

use serde::Deserialize;

/// Default session lifetime: thirty days.
pub const DEFAULT_SESSION_TIMEOUT_SECS: i64 = 60 * 60 * 24 * 30;

/// Configuration for [`LockManager`](crate::LockManager).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LockConfig {
    /// Expire held locks after this many seconds so a crashed holder cannot
    /// deadlock the resource. `None` keeps locks until released. Zero is
    /// rejected when parsing: a lock that expires as it is taken excludes
    /// nobody.
    #[serde(default)]
    pub ttl_secs: Option<NonZeroU64>,

    /// Prefix prepended to every lock name, e.g. `"lock"` turns `orders`
    /// into `lock:orders`. Empty means lock names are used verbatim.
    #[serde(default)]
    pub key_prefix: String,
}

impl LockConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(|secs| Duration::from_secs(secs.get()))
    }
}

/// Configuration for [`SessionManager`](crate::SessionManager).
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Lifetime used by `create_token` when no timeout is given.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: i64,

    /// Hash holding the current token per principal.
    #[serde(default = "default_token_hash")]
    pub token_hash: String,

    /// Hash holding the expiry timestamp per principal.
    #[serde(default = "default_expiry_hash")]
    pub expiry_hash: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            token_hash: default_token_hash(),
            expiry_hash: default_expiry_hash(),
        }
    }
}

fn default_timeout_secs() -> i64 {
    DEFAULT_SESSION_TIMEOUT_SECS
}

fn default_token_hash() -> String {
    "SESSION_TOKEN_HASH".to_owned()
}

fn default_expiry_hash() -> String {
    "SESSION_TOKEN_HASH_EXPIRE".to_owned()
}
