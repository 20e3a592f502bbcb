//! `RedisListCache` and `CachedTaskStore` against a live Redis.
//!
//! All tests are `#[ignore]` and require Redis, by default on
//! `localhost:6379` (override with `REDIS_URL`):
//!
//! ```bash
//! docker run -d -p 6379:6379 redis:7-alpine
//! cargo test -p task-core --test redis_cache -- --ignored --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use task_core::cache::{list_cache_key, LIST_KEY_PREFIX};
use task_core::{
    CachedTaskStore, InMemoryTaskStore, ListCache, ListQuery, NewTask, RedisListCache, TaskFilter,
    TaskStore,
};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "localhost:6379".to_string())
}

async fn cache() -> RedisListCache {
    let cache = RedisListCache::from_address(&redis_url()).expect("build redis pool");
    cache
        .ping(Duration::from_secs(2))
        .await
        .expect("redis reachable");
    cache
}

#[tokio::test]
#[ignore]
async fn set_get_and_flush_namespace() {
    let cache = cache().await;
    let key = format!("{LIST_KEY_PREFIX}it:{}", uuid::Uuid::new_v4());
    cache.set(&key, "[]", Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("[]"));

    let removed = cache.invalidate_prefix(LIST_KEY_PREFIX).await.unwrap();
    assert!(removed >= 1);
    assert_eq!(cache.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn entries_expire() {
    let cache = cache().await;
    let key = format!("{LIST_KEY_PREFIX}ttl:{}", uuid::Uuid::new_v4());
    cache.set(&key, "[]", Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn cached_store_populates_and_invalidates() {
    let cache = Arc::new(cache().await);
    let store = CachedTaskStore::new(InMemoryTaskStore::new(), Some(cache.clone()));
    let query = ListQuery::new(100, 0, TaskFilter::assignee(uuid::Uuid::new_v4().to_string()));
    let key = list_cache_key(&query);

    assert!(store.list(&query).await.unwrap().is_empty());
    assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("[]"));

    store.create(NewTask::new("bust the cache")).await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn unreachable_redis_fails_ping() {
    let cache = RedisListCache::from_address("127.0.0.1:1").unwrap();
    assert!(cache.ping(Duration::from_millis(500)).await.is_err());
}
