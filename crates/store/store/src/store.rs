use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// A single field write used by [`KeyValueStore::hash_set_many`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashWrite<'a> {
    pub hash: &'a str,
    pub field: &'a str,
    pub value: &'a str,
}

impl<'a> HashWrite<'a> {
    pub fn new(hash: &'a str, field: &'a str, value: &'a str) -> Self {
        Self { hash, field, value }
    }
}

/// Address of a single field inside a named hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashField<'a> {
    pub hash: &'a str,
    pub field: &'a str,
}

impl<'a> HashField<'a> {
    pub fn new(hash: &'a str, field: &'a str) -> Self {
        Self { hash, field }
    }
}

/// Whole milliseconds a TTL lasts in the store, rounded up.
///
/// Every backend stores TTLs at millisecond precision. Rounding up keeps a
/// sub-millisecond TTL from collapsing to zero, which would otherwise mean
/// "expired at once" in one backend and "never expires" in another.
///
/// # Errors
///
/// [`StoreError::InvalidTtl`] for a zero TTL.
pub fn ttl_millis(ttl: Duration) -> Result<u64, StoreError> {
    if ttl.is_zero() {
        return Err(StoreError::InvalidTtl(ttl));
    }
    Ok(u64::try_from(ttl.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX))
}

/// The external key-value service that locks and sessions are built on.
///
/// Every single-key method must be atomic with respect to every other call
/// on the same key. The `*_many` methods must apply all of their writes or
/// deletes as one atomic unit. Implementations must be `Send + Sync` and safe
/// for concurrent access.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Set `key` to `value` only if the key does not exist, with an optional
    /// TTL. Returns `true` if this call created the key.
    ///
    /// A TTL is rounded up to whole milliseconds (see [`ttl_millis`]); a zero
    /// TTL is rejected with [`StoreError::InvalidTtl`] and writes nothing.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    /// Get the value of a plain key. Returns `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete a plain key. Returns the number of keys removed (0 or 1).
    async fn delete(&self, key: &str) -> Result<u64, StoreError>;

    /// Delete `key` only if its current value equals `expected`.
    /// Returns `true` if the key was removed.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// Set `field` of hash `hash` to `value`, overwriting.
    async fn hash_set(&self, hash: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Apply every write atomically: readers observe all of them or none.
    async fn hash_set_many(&self, writes: &[HashWrite<'_>]) -> Result<(), StoreError>;

    /// Get `field` of hash `hash`.
    async fn hash_get(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Check whether `field` exists in hash `hash`.
    async fn hash_exists(&self, hash: &str, field: &str) -> Result<bool, StoreError>;

    /// Remove `field` from hash `hash`. Missing fields are not an error.
    async fn hash_delete(&self, hash: &str, field: &str) -> Result<(), StoreError>;

    /// Remove every listed field atomically. Missing fields are not an error.
    async fn hash_delete_many(&self, fields: &[HashField<'_>]) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_dyn_store(_: &dyn KeyValueStore) {}

    #[test]
    fn ttl_rounds_up_to_whole_millis() {
        assert_eq!(ttl_millis(Duration::from_secs(2)).unwrap(), 2000);
        assert_eq!(ttl_millis(Duration::from_micros(1)).unwrap(), 1);
        assert_eq!(ttl_millis(Duration::from_micros(1500)).unwrap(), 2);
        assert_eq!(ttl_millis(Duration::MAX).unwrap(), u64::MAX);
    }

    #[test]
    fn zero_ttl_is_rejected() {
        assert!(matches!(
            ttl_millis(Duration::ZERO),
            Err(StoreError::InvalidTtl(d)) if d.is_zero()
        ));
    }

    #[test]
    fn hash_write_constructor() {
        let w = HashWrite::new("h", "f", "v");
        assert_eq!(
            w,
            HashWrite {
                hash: "h",
                field: "f",
                value: "v"
            }
        );
    }
}
