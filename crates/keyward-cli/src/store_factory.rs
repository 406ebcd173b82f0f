use std::sync::Arc;
#[cfg(feature = "redis")]
use std::time::Duration;

use anyhow::bail;
use tracing::info;

use keyward_store::KeyValueStore;
use keyward_store_memory::MemoryStore;
#[cfg(feature = "redis")]
use keyward_store_redis::{RedisConfig, RedisStore};

use crate::config::StoreConfig;

/// Create a key-value store from the given configuration.
pub fn create_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        #[cfg(feature = "redis")]
        "redis" => {
            let mut redis_config = RedisConfig::default();
            if let Some(url) = &config.url {
                redis_config.url.clone_from(url);
            }
            if let Some(prefix) = &config.prefix {
                redis_config.prefix.clone_from(prefix);
            }
            if let Some(size) = config.pool_size {
                redis_config.pool_size = size;
            }
            if let Some(ms) = config.connection_timeout_ms {
                redis_config.connection_timeout = Duration::from_millis(ms);
            }

            let store = RedisStore::new(&redis_config)
                .map_err(|e| anyhow::anyhow!("redis store: {e}"))?;
            Arc::new(store)
        }
        other => bail!("unsupported store backend: {other}"),
    };

    info!(backend = %config.backend, "store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend() {
        assert!(create_store(&StoreConfig::default()).is_ok());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let config = StoreConfig {
            backend: "etcd".into(),
            ..StoreConfig::default()
        };
        let err = create_store(&config).err().expect("etcd is not a backend");
        assert!(err.to_string().contains("etcd"));
    }

    #[cfg(feature = "redis")]
    #[tokio::test]
    async fn redis_backend_builds_lazily() {
        let config = StoreConfig {
            backend: "redis".into(),
            url: Some("redis://127.0.0.1:6379".into()),
            ..StoreConfig::default()
        };
        assert!(create_store(&config).is_ok());
    }
}
