use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::{AsyncCommands, RedisError, Script};

use keyward_store::error::StoreError;
use keyward_store::store::{HashField, HashWrite, KeyValueStore, ttl_millis};

use crate::config::RedisConfig;
use crate::key_render::render_key;
use crate::scripts;

/// Redis-backed implementation of [`KeyValueStore`].
///
/// Uses a `deadpool-redis` connection pool. Conditional writes and
/// compare-and-delete run as Lua scripts; multi-field hash batches run as
/// `MULTI`/`EXEC` pipelines. Every key and hash name is namespaced with the
/// configured prefix.
pub struct RedisStore {
    pool: Pool,
    prefix: String,
}

impl RedisStore {
    /// Create a new `RedisStore` from the provided configuration.
    ///
    /// No connection is opened until the first command.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, StoreError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    fn key(&self, key: &str) -> String {
        render_key(&self.prefix, key)
    }

    /// Obtain a connection from the pool.
    async fn conn(&self) -> Result<deadpool_redis::Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

/// Classify a Redis error: transport failures are connection errors, the
/// rest are command failures.
fn map_redis_err(e: &RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
    {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Backend(e.to_string())
    }
}

/// Largest `PX` Redis accepts without overflowing its own clock.
const MAX_PX_MILLIS: u64 = i64::MAX.unsigned_abs() / 2;

/// `PX` argument for [`scripts::SET_IF_ABSENT`]; 0 means no expiry.
///
/// A deadline beyond what Redis can represent never arrives, so it is
/// stored without expiry, as the memory backend does.
fn px_arg(ttl: Option<Duration>) -> Result<u64, StoreError> {
    match ttl.map(ttl_millis).transpose()? {
        Some(ms) if ms <= MAX_PX_MILLIS => Ok(ms),
        _ => Ok(0),
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let px = px_arg(ttl)?;
        let redis_key = self.key(key);
        let mut conn = self.conn().await?;

        let script = Script::new(scripts::SET_IF_ABSENT);
        let result: i64 = script
            .key(&redis_key)
            .arg(value)
            .arg(px)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_err(&e))?;

        Ok(result == 1)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let redis_key = self.key(key);
        let mut conn = self.conn().await?;
        conn.get(&redis_key).await.map_err(|e| map_redis_err(&e))
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        let redis_key = self.key(key);
        let mut conn = self.conn().await?;
        conn.del(&redis_key).await.map_err(|e| map_redis_err(&e))
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let redis_key = self.key(key);
        let mut conn = self.conn().await?;

        let script = Script::new(scripts::DELETE_IF_EQUALS);
        let result: i64 = script
            .key(&redis_key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_err(&e))?;

        Ok(result == 1)
    }

    async fn hash_set(&self, hash: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let redis_key = self.key(hash);
        let mut conn = self.conn().await?;
        let () = conn
            .hset(&redis_key, field, value)
            .await
            .map_err(|e| map_redis_err(&e))?;
        Ok(())
    }

    async fn hash_set_many(&self, writes: &[HashWrite<'_>]) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for write in writes {
            pipe.hset(self.key(write.hash), write.field, write.value)
                .ignore();
        }

        let mut conn = self.conn().await?;
        pipe.exec_async(&mut conn)
            .await
            .map_err(|e| map_redis_err(&e))
    }

    async fn hash_get(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError> {
        let redis_key = self.key(hash);
        let mut conn = self.conn().await?;
        conn.hget(&redis_key, field)
            .await
            .map_err(|e| map_redis_err(&e))
    }

    async fn hash_exists(&self, hash: &str, field: &str) -> Result<bool, StoreError> {
        let redis_key = self.key(hash);
        let mut conn = self.conn().await?;
        conn.hexists(&redis_key, field)
            .await
            .map_err(|e| map_redis_err(&e))
    }

    async fn hash_delete(&self, hash: &str, field: &str) -> Result<(), StoreError> {
        let redis_key = self.key(hash);
        let mut conn = self.conn().await?;
        let () = conn
            .hdel(&redis_key, field)
            .await
            .map_err(|e| map_redis_err(&e))?;
        Ok(())
    }

    async fn hash_delete_many(&self, fields: &[HashField<'_>]) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for f in fields {
            pipe.hdel(self.key(f.hash), f.field).ignore();
        }

        let mut conn = self.conn().await?;
        pipe.exec_async(&mut conn)
            .await
            .map_err(|e| map_redis_err(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn px_arg_for_common_ttls() {
        assert_eq!(px_arg(None).unwrap(), 0);
        assert_eq!(px_arg(Some(Duration::from_secs(2))).unwrap(), 2000);
        assert_eq!(
            px_arg(Some(Duration::from_micros(200))).unwrap(),
            1,
            "sub-millisecond ttl must not become 'no expiry'"
        );
        assert_eq!(px_arg(Some(Duration::MAX)).unwrap(), 0);
    }

    #[test]
    fn zero_ttl_is_rejected_before_any_command() {
        assert!(matches!(
            px_arg(Some(Duration::ZERO)),
            Err(StoreError::InvalidTtl(_))
        ));
    }

    #[test]
    fn io_errors_are_connection_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = map_redis_err(&RedisError::from(io));
        assert!(err.is_connection());
    }

    #[test]
    fn command_errors_are_backend_errors() {
        let err = map_redis_err(&RedisError::from((
            redis::ErrorKind::TypeError,
            "WRONGTYPE",
        )));
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        // Port 1 is reserved and nothing listens there.
        let config = RedisConfig {
            connection_timeout: Duration::from_millis(500),
            ..RedisConfig::new("redis://127.0.0.1:1")
        };
        let store = RedisStore::new(&config).expect("pool creation is lazy");
        let err = store
            .set_if_absent("k", "v", None)
            .await
            .expect_err("no server is listening");
        assert!(err.is_connection(), "got {err:?}");
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;
    use crate::config::RedisConfig;

    fn test_config() -> RedisConfig {
        RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            prefix: format!("keyward-test-{}", uuid::Uuid::new_v4()),
            ..RedisConfig::default()
        }
    }

    #[tokio::test]
    async fn store_conformance() {
        let config = test_config();
        let store = RedisStore::new(&config).expect("pool creation should succeed");
        keyward_store::testing::run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }
}
