use std::time::Duration;

use crate::error::StoreError;
use crate::store::{HashField, HashWrite, KeyValueStore};

/// Run the full key-value store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if the store fails an operation.
pub async fn run_store_conformance_tests(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    test_get_missing(store).await?;
    test_set_if_absent_new(store).await?;
    test_set_if_absent_existing(store).await?;
    test_set_if_absent_with_ttl(store).await?;
    test_ttl_expiry(store).await?;
    test_zero_ttl_rejected(store).await?;
    test_sub_millisecond_ttl_expires(store).await?;
    test_delete(store).await?;
    test_delete_if_equals(store).await?;
    test_hash_set_and_get(store).await?;
    test_hash_overwrite(store).await?;
    test_hash_exists(store).await?;
    test_hash_delete(store).await?;
    test_hash_set_many(store).await?;
    test_hash_delete_many(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    let val = store.get("conf:missing").await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_set_if_absent_new(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    let created = store.set_if_absent("conf:nx-new", "v1", None).await?;
    assert!(created, "set_if_absent on new key should return true");
    let val = store.get("conf:nx-new").await?;
    assert_eq!(val.as_deref(), Some("v1"));
    Ok(())
}

async fn test_set_if_absent_existing(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    assert!(store.set_if_absent("conf:nx-existing", "v1", None).await?);
    let created = store.set_if_absent("conf:nx-existing", "v2", None).await?;
    assert!(
        !created,
        "set_if_absent on existing key should return false"
    );
    let val = store.get("conf:nx-existing").await?;
    assert_eq!(val.as_deref(), Some("v1"), "first value should remain");
    Ok(())
}

async fn test_set_if_absent_with_ttl(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    let created = store
        .set_if_absent("conf:nx-ttl", "ephemeral", Some(Duration::from_secs(3600)))
        .await?;
    assert!(created);
    let val = store.get("conf:nx-ttl").await?;
    assert_eq!(val.as_deref(), Some("ephemeral"));
    Ok(())
}

async fn test_ttl_expiry(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    let ttl = Some(Duration::from_millis(300));
    assert!(store.set_if_absent("conf:ttl-expiry", "a", ttl).await?);
    assert!(
        !store.set_if_absent("conf:ttl-expiry", "b", None).await?,
        "key should be held until its ttl elapses"
    );

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(
        store.get("conf:ttl-expiry").await?.is_none(),
        "expired key should read as absent"
    );
    assert!(
        store.set_if_absent("conf:ttl-expiry", "b", None).await?,
        "expired key should be writable again"
    );
    Ok(())
}

async fn test_zero_ttl_rejected(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    let result = store
        .set_if_absent("conf:ttl-zero", "a", Some(Duration::ZERO))
        .await;
    assert!(
        matches!(result, Err(StoreError::InvalidTtl(_))),
        "zero ttl should be rejected, got {result:?}"
    );
    assert!(
        store.get("conf:ttl-zero").await?.is_none(),
        "rejected write should leave no key behind"
    );
    assert!(store.set_if_absent("conf:ttl-zero", "a", None).await?);
    Ok(())
}

async fn test_sub_millisecond_ttl_expires(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    let ttl = Some(Duration::from_micros(200));
    assert!(store.set_if_absent("conf:ttl-sub-ms", "a", ttl).await?);

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(
        store.get("conf:ttl-sub-ms").await?.is_none(),
        "sub-millisecond ttl should still expire"
    );
    Ok(())
}

async fn test_delete(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    assert!(store.set_if_absent("conf:to-delete", "bye", None).await?);
    let removed = store.delete("conf:to-delete").await?;
    assert_eq!(removed, 1, "delete should remove an existing key");
    assert!(store.get("conf:to-delete").await?.is_none());

    let removed = store.delete("conf:to-delete").await?;
    assert_eq!(removed, 0, "delete on missing key should remove nothing");
    Ok(())
}

async fn test_delete_if_equals(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    assert!(store.set_if_absent("conf:cad", "owner-a", None).await?);

    let removed = store.delete_if_equals("conf:cad", "owner-b").await?;
    assert!(!removed, "compare-and-delete with wrong value should fail");
    assert_eq!(store.get("conf:cad").await?.as_deref(), Some("owner-a"));

    let removed = store.delete_if_equals("conf:cad", "owner-a").await?;
    assert!(removed, "compare-and-delete with matching value should succeed");
    assert!(store.get("conf:cad").await?.is_none());

    let removed = store.delete_if_equals("conf:cad", "owner-a").await?;
    assert!(!removed, "compare-and-delete on missing key should fail");
    Ok(())
}

async fn test_hash_set_and_get(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store.hash_set("conf:hash", "alice", "hello").await?;
    let val = store.hash_get("conf:hash", "alice").await?;
    assert_eq!(val.as_deref(), Some("hello"));

    let val = store.hash_get("conf:hash", "bob").await?;
    assert!(val.is_none(), "missing field should return None");

    let val = store.hash_get("conf:no-such-hash", "alice").await?;
    assert!(val.is_none(), "missing hash should return None");
    Ok(())
}

async fn test_hash_overwrite(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store.hash_set("conf:hash-ow", "alice", "first").await?;
    store.hash_set("conf:hash-ow", "alice", "second").await?;
    let val = store.hash_get("conf:hash-ow", "alice").await?;
    assert_eq!(val.as_deref(), Some("second"), "hash_set should overwrite");
    Ok(())
}

async fn test_hash_exists(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    assert!(!store.hash_exists("conf:hash-ex", "alice").await?);
    store.hash_set("conf:hash-ex", "alice", "x").await?;
    assert!(store.hash_exists("conf:hash-ex", "alice").await?);
    assert!(!store.hash_exists("conf:hash-ex", "bob").await?);
    Ok(())
}

async fn test_hash_delete(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store.hash_set("conf:hash-del", "alice", "x").await?;
    store.hash_set("conf:hash-del", "bob", "y").await?;
    store.hash_delete("conf:hash-del", "alice").await?;
    assert!(!store.hash_exists("conf:hash-del", "alice").await?);
    assert!(
        store.hash_exists("conf:hash-del", "bob").await?,
        "deleting one field should leave siblings intact"
    );

    // Deleting again is a no-op.
    store.hash_delete("conf:hash-del", "alice").await?;
    Ok(())
}

async fn test_hash_set_many(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store
        .hash_set_many(&[
            HashWrite::new("conf:many-a", "alice", "token"),
            HashWrite::new("conf:many-b", "alice", "123.5"),
        ])
        .await?;
    assert_eq!(
        store.hash_get("conf:many-a", "alice").await?.as_deref(),
        Some("token")
    );
    assert_eq!(
        store.hash_get("conf:many-b", "alice").await?.as_deref(),
        Some("123.5")
    );

    // Empty batches are accepted.
    store.hash_set_many(&[]).await?;
    Ok(())
}

async fn test_hash_delete_many(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store
        .hash_set_many(&[
            HashWrite::new("conf:dmany-a", "alice", "token"),
            HashWrite::new("conf:dmany-b", "alice", "1.0"),
        ])
        .await?;
    let fields = [
        HashField::new("conf:dmany-a", "alice"),
        HashField::new("conf:dmany-b", "alice"),
    ];
    store.hash_delete_many(&fields).await?;
    assert!(!store.hash_exists("conf:dmany-a", "alice").await?);
    assert!(!store.hash_exists("conf:dmany-b", "alice").await?);

    // Idempotent.
    store.hash_delete_many(&fields).await?;
    store.hash_delete_many(&[]).await?;
    Ok(())
}
