//! Tests for the entity cache.

use cardinal_cache::{Entity, EntityCache};
use cardinal_error::{ApiError, CardinalResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug)]
struct Record {
    id: String,
    value: AtomicUsize,
}

impl Record {
    fn new(id: &str, value: usize) -> Self {
        Self {
            id: id.to_string(),
            value: AtomicUsize::new(value),
        }
    }
}

impl Entity for Record {
    type Id = String;
    const KIND: &'static str = "record";

    fn id(&self) -> String {
        self.id.clone()
    }
}

#[tokio::test]
async fn test_get_or_fetch_caches_result() {
    let cache = EntityCache::<Record>::new();
    let calls = &AtomicUsize::new(0);
    let id = "1".to_string();

    let first = cache
        .get_or_fetch(&id, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Record::new("1", 10)))
        })
        .await
        .expect("fetch should succeed")
        .expect("record should be present");

    let second = cache
        .get_or_fetch(&id, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Record::new("1", 20)))
        })
        .await
        .expect("fetch should succeed")
        .expect("record should be present");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.value.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn test_absent_is_not_cached() {
    let cache = EntityCache::<Record>::new();
    let id = "missing".to_string();

    let result = cache.get_or_fetch(&id, || async move { Ok(None) }).await;
    assert!(matches!(result, Ok(None)));
    assert!(cache.is_empty());

    let result = cache
        .get_or_fetch(&id, || async move { Ok(Some(Record::new("missing", 1))) })
        .await
        .expect("fetch should succeed");
    assert!(result.is_some());
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_failed_fetch_propagates_and_is_not_cached() {
    let cache = EntityCache::<Record>::new();
    let id = "1".to_string();

    let result = cache
        .get_or_fetch(&id, || async move {
            let outcome: CardinalResult<Option<Record>> = Err(ApiError::new(
                "Internal Server Error",
                500,
                "GET",
                "/records/1",
                None,
            )
            .into());
            outcome
        })
        .await;

    let err = result.expect_err("fetch error should surface");
    assert_eq!(err.status(), Some(500));
    assert!(cache.is_empty());
    assert!(!cache.contains(&id));
}

#[tokio::test]
async fn test_concurrent_fetches_share_one_request() {
    let cache = EntityCache::<Record>::new();
    let calls = &AtomicUsize::new(0);
    let id = "1".to_string();

    let fetch = || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(Some(Record::new("1", 1)))
    };

    let (a, b) = tokio::join!(cache.get_or_fetch(&id, fetch), cache.get_or_fetch(&id, fetch));
    let a = a.expect("first fetch").expect("first record");
    let b = b.expect("second fetch").expect("second record");

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_entity_is_cached_under_its_own_id() {
    let cache = EntityCache::<Record>::new();
    let requested = "alias".to_string();

    let record = cache
        .get_or_fetch(&requested, || async move { Ok(Some(Record::new("canonical", 1))) })
        .await
        .expect("fetch should succeed")
        .expect("record should be present");

    assert_eq!(record.id, "canonical");
    assert!(cache.contains(&"canonical".to_string()));
    assert!(!cache.contains(&requested));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_upsert_updates_in_place() {
    let cache = EntityCache::<Record>::new();

    let first = cache.upsert("1".to_string(), || Record::new("1", 1), |_| {});
    let second = cache.upsert(
        "1".to_string(),
        || Record::new("1", 2),
        |existing| existing.value.store(3, Ordering::SeqCst),
    );

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.value.load(Ordering::SeqCst), 3);
}

#[test]
fn test_remove_and_clear() {
    let cache = EntityCache::<Record>::new();
    cache.upsert("1".to_string(), || Record::new("1", 1), |_| {});
    cache.upsert("2".to_string(), || Record::new("2", 2), |_| {});

    let weak = cache.downgrade();
    assert!(weak.remove(&"1".to_string()));
    assert!(!weak.remove(&"1".to_string()));
    assert!(weak.get(&"2".to_string()).is_some());

    assert_eq!(cache.clear(), 1);
    assert!(cache.is_empty());
}

#[test]
fn test_weak_handle_does_not_keep_cache_alive() {
    let cache = EntityCache::<Record>::new();
    cache.upsert("1".to_string(), || Record::new("1", 1), |_| {});
    let weak = cache.downgrade();
    drop(cache);

    assert!(!weak.remove(&"1".to_string()));
    assert!(weak.get(&"1".to_string()).is_none());
}

#[test]
fn test_clones_share_entries() {
    let cache = EntityCache::<Record>::new();
    let shared = cache.clone();

    let inserted = cache.upsert("1".to_string(), || Record::new("1", 1), |_| {});

    let seen = shared.get(&"1".to_string()).expect("clone sees the entry");
    assert!(Arc::ptr_eq(&inserted, &seen));
    assert_eq!(shared.clear(), 1);
    assert!(cache.is_empty());
}

#[test]
fn test_remove_instance_spares_replacement() {
    let cache = EntityCache::<Record>::new();
    let weak = cache.downgrade();
    let id = "1".to_string();

    let stale = cache.upsert(id.clone(), || Record::new("1", 1), |_| {});
    assert!(weak.remove_instance(&id, &stale));

    let fresh = cache.upsert(id.clone(), || Record::new("1", 2), |_| {});
    assert!(!Arc::ptr_eq(&stale, &fresh));

    assert!(!weak.remove_instance(&id, &stale));
    let cached = cache.get(&id).expect("replacement stays cached");
    assert!(Arc::ptr_eq(&cached, &fresh));

    assert!(weak.remove_instance(&id, &fresh));
    assert!(cache.is_empty());
}
