use super::*;
use crate::row;
use crate::value::Row;
use std::time::SystemTime;

fn directive(key: &str, secs: u64) -> CacheDirective {
    CacheDirective {
        key: key.to_string(),
        ttl: Duration::from_secs(secs),
    }
}

#[test]
fn test_scope_prefixes() {
    assert_eq!(CacheScope::Get.key("users"), "get_users");
    assert_eq!(CacheScope::Paginate.key("users"), "paginate_users");
}

#[tokio::test]
async fn test_memory_round_trip_and_expiry() {
    let clock = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)));
    let cache = ResultCache::new(Arc::new(MemoryCacheStore::new())).with_clock(clock.clone());
    let d = directive("users", 60);
    let rows = vec![row! { "id" => 1, "name" => "alice" }];

    assert!(cache.lookup::<Vec<Row>>(CacheScope::Get, &d).await.is_none());
    cache.save(CacheScope::Get, &d, &rows).await;
    assert_eq!(cache.lookup::<Vec<Row>>(CacheScope::Get, &d).await, Some(rows.clone()));

    clock.advance(Duration::from_secs(60));
    assert!(cache.lookup::<Vec<Row>>(CacheScope::Get, &d).await.is_some());

    clock.advance(Duration::from_secs(1));
    assert!(cache.lookup::<Vec<Row>>(CacheScope::Get, &d).await.is_none());
}

#[tokio::test]
async fn test_undecodable_entry_is_a_miss() {
    let store = Arc::new(MemoryCacheStore::new());
    store
        .put("count_n", b"not zstd".to_vec(), SystemTime::now())
        .await
        .unwrap();
    let cache = ResultCache::new(store);

    assert!(cache.read::<u64>("count_n", Duration::from_secs(60)).await.is_err());
    assert!(cache.lookup::<u64>(CacheScope::Count, &directive("n", 60)).await.is_none());
}

#[tokio::test]
async fn test_file_store_names_and_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH + Duration::from_secs(86_400)));
    let store = Arc::new(FileCacheStore::new(dir.path()));
    let cache = ResultCache::new(store.clone()).with_clock(clock.clone());
    let d = directive("reports/2024\\q1", 60);

    cache.save(CacheScope::Count, &d, &42u64).await;

    let path = store.path_for("count_reports/2024\\q1");
    assert_eq!(path.file_name().unwrap(), "count_reports-2024-q1.cache");
    assert!(path.exists());
    assert_eq!(cache.lookup::<u64>(CacheScope::Count, &d).await, Some(42));

    clock.advance(Duration::from_secs(61));
    assert_eq!(cache.lookup::<u64>(CacheScope::Count, &d).await, None);

    cache.save(CacheScope::Count, &d, &43u64).await;
    assert_eq!(cache.lookup::<u64>(CacheScope::Count, &d).await, Some(43));

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1, "temporary files must be renamed away");
}

#[tokio::test]
async fn test_forget_removes_all_scopes() {
    let store = Arc::new(MemoryCacheStore::new());
    let cache = ResultCache::new(store.clone());
    let d = directive("users", 60);
    cache.save(CacheScope::Get, &d, &Vec::<Row>::new()).await;
    cache.save(CacheScope::Count, &d, &0u64).await;
    assert_eq!(store.len(), 2);

    cache.forget("users").await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_cold_file_store_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResultCache::from_config(&CacheConfig::new().with_directory(dir.path().join("nested")));
    assert!(cache.lookup::<u64>(CacheScope::Count, &directive("x", 60)).await.is_none());
}
