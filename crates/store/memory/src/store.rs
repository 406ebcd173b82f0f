use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use keyward_store::error::StoreError;
use keyward_store::store::{HashField, HashWrite, KeyValueStore, ttl_millis};

/// A plain string key in the in-memory store.
#[derive(Debug, Clone)]
struct StringEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl StringEntry {
    /// Returns `true` if this entry has passed its TTL deadline.
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// In-memory [`KeyValueStore`] backed by [`DashMap`]s.
///
/// Plain keys and hashes live in separate maps. Expired plain keys are
/// evicted lazily on the next access. Single-key operations rely on the
/// `DashMap` entry API for atomicity; the `*_many` operations take an
/// exclusive gate that every other operation takes shared, so a batch is
/// never observed half-applied.
///
/// All work is synchronous internally; the async trait methods return
/// immediately.
#[derive(Debug, Default)]
pub struct MemoryStore {
    strings: DashMap<String, StringEntry>,
    hashes: DashMap<String, HashMap<String, String>>,
    gate: RwLock<()>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_if_absent_sync(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let ttl = ttl.map(ttl_millis).transpose()?;
        let _gate = self.shared();

        // Lazy TTL eviction so an expired holder does not block the write.
        self.strings.remove_if(key, |_, entry| entry.is_expired());

        match self.strings.entry(key.to_owned()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                // A deadline past the end of the clock never arrives.
                let expires_at =
                    ttl.and_then(|ms| Instant::now().checked_add(Duration::from_millis(ms)));
                vacant.insert(StringEntry {
                    value: value.to_owned(),
                    expires_at,
                });
                Ok(true)
            }
        }
    }

    fn get_sync(&self, key: &str) -> Option<String> {
        let _gate = self.shared();
        if let Some(entry) = self.strings.get(key) {
            if !entry.is_expired() {
                return Some(entry.value.clone());
            }
        }
        self.strings.remove_if(key, |_, entry| entry.is_expired());
        None
    }

    fn delete_sync(&self, key: &str) -> u64 {
        let _gate = self.shared();
        match self.strings.remove(key) {
            Some((_, entry)) if !entry.is_expired() => 1,
            _ => 0,
        }
    }

    fn delete_if_equals_sync(&self, key: &str, expected: &str) -> bool {
        let _gate = self.shared();
        self.strings
            .remove_if(key, |_, entry| !entry.is_expired() && entry.value == expected)
            .is_some()
    }

    fn hash_set_sync(&self, hash: &str, field: &str, value: &str) {
        self.hashes
            .entry(hash.to_owned())
            .or_default()
            .insert(field.to_owned(), value.to_owned());
    }

    fn hash_set_one(&self, hash: &str, field: &str, value: &str) {
        let _gate = self.shared();
        self.hash_set_sync(hash, field, value);
    }

    fn hash_set_batch(&self, writes: &[HashWrite<'_>]) {
        let _gate = self.exclusive();
        for write in writes {
            self.hash_set_sync(write.hash, write.field, write.value);
        }
    }

    fn hash_get_sync(&self, hash: &str, field: &str) -> Option<String> {
        let _gate = self.shared();
        self.hashes
            .get(hash)
            .and_then(|fields| fields.get(field).cloned())
    }

    fn hash_exists_sync(&self, hash: &str, field: &str) -> bool {
        let _gate = self.shared();
        self.hashes
            .get(hash)
            .is_some_and(|fields| fields.contains_key(field))
    }

    fn hash_delete_sync(&self, hash: &str, field: &str) {
        if let Some(mut fields) = self.hashes.get_mut(hash) {
            fields.remove(field);
        }
        // An empty hash disappears, as it does in Redis.
        self.hashes.remove_if(hash, |_, fields| fields.is_empty());
    }

    fn hash_delete_one(&self, hash: &str, field: &str) {
        let _gate = self.shared();
        self.hash_delete_sync(hash, field);
    }

    fn hash_delete_batch(&self, fields: &[HashField<'_>]) {
        let _gate = self.exclusive();
        for f in fields {
            self.hash_delete_sync(f.hash, f.field);
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        self.set_if_absent_sync(key, value, ttl)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_sync(key))
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.delete_sync(key))
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        Ok(self.delete_if_equals_sync(key, expected))
    }

    async fn hash_set(&self, hash: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.hash_set_one(hash, field, value);
        Ok(())
    }

    async fn hash_set_many(&self, writes: &[HashWrite<'_>]) -> Result<(), StoreError> {
        self.hash_set_batch(writes);
        Ok(())
    }

    async fn hash_get(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self.hash_get_sync(hash, field))
    }

    async fn hash_exists(&self, hash: &str, field: &str) -> Result<bool, StoreError> {
        Ok(self.hash_exists_sync(hash, field))
    }

    async fn hash_delete(&self, hash: &str, field: &str) -> Result<(), StoreError> {
        self.hash_delete_one(hash, field);
        Ok(())
    }

    async fn hash_delete_many(&self, fields: &[HashField<'_>]) -> Result<(), StoreError> {
        self.hash_delete_batch(fields);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use keyward_store::testing::run_store_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryStore::new();
        run_store_conformance_tests(&store)
            .await
            .expect("store conformance tests should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expiry_frees_key() {
        let store = MemoryStore::new();
        assert!(
            store
                .set_if_absent("k", "a", Some(Duration::from_secs(2)))
                .await
                .unwrap()
        );
        assert!(!store.set_if_absent("k", "b", None).await.unwrap());

        tokio::time::advance(Duration::from_secs(3)).await;

        assert!(store.get("k").await.unwrap().is_none());
        assert!(
            store.set_if_absent("k", "b", None).await.unwrap(),
            "expired key should be writable again"
        );
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_key_is_not_deleted_or_matched() {
        let store = MemoryStore::new();
        store
            .set_if_absent("k", "a", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(!store.delete_if_equals("k", "a").await.unwrap());
        assert_eq!(store.delete("k").await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_is_rejected_and_writes_nothing() {
        let store = MemoryStore::new();
        let err = store
            .set_if_absent("k", "a", Some(Duration::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTtl(_)));
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.set_if_absent("k", "a", None).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn sub_millisecond_ttl_holds_for_one_millisecond() {
        let store = MemoryStore::new();
        assert!(
            store
                .set_if_absent("k", "a", Some(Duration::from_micros(10)))
                .await
                .unwrap()
        );
        tokio::time::advance(Duration::from_micros(500)).await;
        assert!(
            !store.set_if_absent("k", "b", None).await.unwrap(),
            "ttl is rounded up, so the key is still held"
        );

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(store.set_if_absent("k", "b", None).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn huge_ttl_never_expires() {
        let store = MemoryStore::new();
        assert!(
            store
                .set_if_absent("k", "a", Some(Duration::MAX))
                .await
                .unwrap()
        );
        tokio::time::advance(Duration::from_secs(86_400 * 365)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn empty_hash_is_dropped() {
        let store = MemoryStore::new();
        store.hash_set("h", "f", "v").await.unwrap();
        store.hash_delete("h", "f").await.unwrap();
        assert!(store.hashes.get("h").is_none());
    }

    #[tokio::test]
    async fn concurrent_set_if_absent_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();

        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .set_if_absent("race", &i.to_string(), None)
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for h in handles {
            if h.await.expect("task should not panic") {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "exactly one writer should create the key");
    }
}
