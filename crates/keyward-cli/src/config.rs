use std::path::Path;

use serde::Deserialize;

use keyward::{LockConfig, SessionConfig};

/// Top-level configuration, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct KeywardConfig {
    /// Store backend configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Lock manager configuration.
    #[serde(default)]
    pub lock: LockConfig,
    /// Session manager configuration.
    #[serde(default)]
    pub session: SessionConfig,
}

impl KeywardConfig {
    /// Load configuration from `path`, or use defaults if the file does not
    /// exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(toml::from_str("")?);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Configuration for the key-value store backend.
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// Which backend to use: `"memory"` or `"redis"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Connection URL for the backend (e.g. `redis://localhost:6379`).
    pub url: Option<String>,

    /// Key prefix for backends that support it. Defaults to `"keyward"`.
    pub prefix: Option<String>,

    /// Connection pool size for pooled backends.
    pub pool_size: Option<usize>,

    /// How long to wait for a pooled connection, in milliseconds.
    pub connection_timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            prefix: None,
            pool_size: None,
            connection_timeout_ms: None,
        }
    }
}

impl StoreConfig {
    /// Whether the backend is shared between processes. The `memory` backend
    /// lives and dies with a single `keyward` invocation.
    pub fn is_shared(&self) -> bool {
        self.backend != "memory"
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}
