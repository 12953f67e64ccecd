mod common;

use common::*;
use quarry::prelude::*;
use quarry::{CacheBlob, CacheStore, FileCacheStore, ManualClock, MemoryCacheStore, ResultCache};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

const TTL: Duration = Duration::from_secs(60);

fn cached_db(
    store: Arc<dyn CacheStore>,
) -> (Arc<ScriptedConnection>, Arc<Database>, Arc<ManualClock>) {
    let people = users(3);
    let conn = ScriptedConnection::new(Dialect::MySql, &["users", "posts"], move |sql, params| {
        if sql.starts_with("SELECT COUNT(*)") {
            Ok(count_row(people.len()))
        } else if sql.contains("FROM `posts`") {
            let posts = vec![row! { "id" => 1, "user_id" => 1, "title" => "hello" }];
            Ok(rows_in(&posts, "user_id", params))
        } else {
            Ok(page_of(&people, sql))
        }
    });
    let clock = Arc::new(ManualClock::new(
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
    ));
    let connector = ScriptedConnector::new().serve("app", conn.clone());
    let db = Database::builder(connector)
        .connection("default", profile(Dialect::MySql, "app"))
        .cache(ResultCache::new(store).with_clock(clock.clone()))
        .build()
        .unwrap();
    (conn, db, clock)
}

async fn cached_users(db: &Database) -> Vec<Row> {
    db.table("users")
        .await
        .unwrap()
        .with("posts", "posts", "user_id", "id")
        .unwrap()
        .cache("users", TTL)
        .get()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_get_executes_once_within_ttl() {
    let (conn, db, clock) = cached_db(Arc::new(MemoryCacheStore::new()));

    let first = cached_users(&db).await;
    assert_eq!(conn.statements().len(), 2); // users + posts
    assert_eq!(conn.existence_checks(), 1);

    clock.advance(Duration::from_secs(30));
    let second = cached_users(&db).await;
    assert_eq!(second, first);
    assert_eq!(conn.statements().len(), 2);

    clock.advance(Duration::from_secs(31));
    let third = cached_users(&db).await;
    assert_eq!(third, first);
    assert_eq!(conn.statements().len(), 4);

    // The refreshed entry is served again.
    clock.advance(Duration::from_secs(10));
    cached_users(&db).await;
    assert_eq!(conn.statements().len(), 4);
    // Table checks are not cached: one per `table` call.
    assert_eq!(conn.existence_checks(), 4);
}

#[tokio::test]
async fn test_cached_payload_is_the_resolved_shape() {
    let (conn, db, _clock) = cached_db(Arc::new(MemoryCacheStore::new()));
    cached_users(&db).await;
    let before = conn.statements().len();

    let rows = cached_users(&db).await;
    assert_eq!(conn.statements().len(), before);
    let posts = rows[0].get("posts").and_then(Value::as_rows).unwrap();
    assert_eq!(posts[0].get("title"), Some(&Value::from("hello")));
    assert_eq!(rows[2].get("posts"), Some(&Value::Rows(Vec::new())));
}

#[tokio::test]
async fn test_scopes_do_not_share_entries() {
    let (conn, db, _clock) = cached_db(Arc::new(MemoryCacheStore::new()));
    let total = db
        .table("users")
        .await
        .unwrap()
        .cache("users", TTL)
        .count()
        .await
        .unwrap();
    assert_eq!(total, 3);

    let row = db
        .table("users")
        .await
        .unwrap()
        .cache("users", TTL)
        .fetch()
        .await
        .unwrap();
    assert!(row.is_some());

    let page = db
        .table("users")
        .await
        .unwrap()
        .cache("users", TTL)
        .paginate(1, 2, 1)
        .await
        .unwrap();
    assert_eq!(page.data.len(), 2);
    let executed = conn.statements().len();
    assert_eq!(executed, 4);

    let again = db
        .table("users")
        .await
        .unwrap()
        .cache("users", TTL)
        .paginate(1, 2, 1)
        .await
        .unwrap();
    assert_eq!(again, page);
    assert_eq!(
        db.table("users").await.unwrap().cache("users", TTL).count().await.unwrap(),
        3
    );
    assert_eq!(conn.statements().len(), executed);
}

#[tokio::test]
async fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCacheStore::new(dir.path()));
    let (conn, db, clock) = cached_db(store.clone());

    cached_users(&db).await;
    assert!(store.path_for("get_users").exists());

    cached_users(&db).await;
    assert_eq!(conn.statements().len(), 2);

    clock.advance(Duration::from_secs(61));
    cached_users(&db).await;
    assert_eq!(conn.statements().len(), 4);

    db.cache().forget("users").await.unwrap();
    assert!(!store.path_for("get_users").exists());
}

struct BrokenStore;

#[async_trait::async_trait]
impl CacheStore for BrokenStore {
    async fn get(&self, _key: &str) -> QuarryResult<Option<CacheBlob>> {
        Err(QuarryError::Serialization("disk on fire".into()))
    }

    async fn put(&self, _key: &str, _bytes: Vec<u8>, _modified: SystemTime) -> QuarryResult<()> {
        Err(QuarryError::Serialization("disk on fire".into()))
    }

    async fn remove(&self, _key: &str) -> QuarryResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_store_failures_fall_back_to_execution() {
    let (conn, db, _clock) = cached_db(Arc::new(BrokenStore));
    let rows = cached_users(&db).await;
    assert_eq!(rows.len(), 3);
    cached_users(&db).await;
    assert_eq!(conn.statements().len(), 4);
}
