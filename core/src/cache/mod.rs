//! Cache-aside layer for list queries.
//!
//! # Design
//! - `ListCache` is a minimal string key/value contract with expiry plus a
//!   namespace flush. `RedisListCache` is the production backend;
//!   `InMemoryListCache` backs tests.
//! - `CachedTaskStore` wraps any `TaskStore`. Its cache is an `Option` fixed
//!   at construction; with `None` every call goes straight to the store.
//! - Keys are derived from the normalized `ListQuery`, so `limit=0` and
//!   `limit=100` share one entry.
//! - Each cache call is bounded by an operation timeout. An elapsed call is
//!   a `CacheError` like any other, so a stalled backend costs at most one
//!   timeout per call and never blocks the store path.
//! - Every successful write flushes the whole `tasks:list:` namespace. A
//!   list that repopulates concurrently with the flush can leave one stale
//!   entry behind, bounded by the TTL.

pub mod memory;
pub mod redis;
pub mod store;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::task::ListQuery;

pub use self::memory::InMemoryListCache;
pub use self::redis::RedisListCache;
pub use self::store::CachedTaskStore;

/// Prefix shared by every cached list entry.
pub const LIST_KEY_PREFIX: &str = "tasks:list:";

/// Expiry applied to cached list pages.
pub const DEFAULT_LIST_TTL: Duration = Duration::from_secs(60);

/// Longest a single cache call may take before it is abandoned.
pub const DEFAULT_CACHE_OP_TIMEOUT: Duration = Duration::from_millis(500);

/// Written in place of an absent filter.
const ANY: &str = "any";

/// Failure inside a cache backend. Logged by `CachedTaskStore`, never
/// returned to its callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),

    #[error("cache command failed: {0}")]
    Command(String),

    #[error("cache payload invalid: {0}")]
    Serialization(String),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<::redis::RedisError> for CacheError {
    fn from(error: ::redis::RedisError) -> Self {
        CacheError::Command(error.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(error: deadpool_redis::PoolError) -> Self {
        CacheError::Connection(error.to_string())
    }
}

#[async_trait]
pub trait ListCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Remove every key starting with `prefix`. Returns how many were removed.
    async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}

/// Cache key for one normalized list query.
///
/// An absent filter is written as `any`. A present assignee is written as a
/// JSON string literal (quoted and escaped), so no assignee value, including
/// one literally named `any`, can collide with the sentinel or smuggle in a
/// `:` separator.
pub fn list_cache_key(query: &ListQuery) -> String {
    let completed = query
        .filter
        .completed
        .map_or_else(|| ANY.to_string(), |completed| completed.to_string());
    let assignee = query.filter.assignee.as_deref().map_or_else(
        || ANY.to_string(),
        |assignee| serde_json::Value::from(assignee).to_string(),
    );
    format!(
        "{LIST_KEY_PREFIX}limit={}:offset={}:completed={completed}:assignee={assignee}",
        query.limit, query.offset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskFilter;
    use proptest::prelude::*;

    #[test]
    fn key_for_unfiltered_query() {
        let key = list_cache_key(&ListQuery::default());
        assert_eq!(
            key,
            "tasks:list:limit=100:offset=0:completed=any:assignee=any"
        );
    }

    #[test]
    fn key_for_both_filters() {
        let query = ListQuery::new(10, 20, TaskFilter::assignee("alice").with_completed(true));
        assert_eq!(
            list_cache_key(&query),
            "tasks:list:limit=10:offset=20:completed=true:assignee=\"alice\""
        );
    }

    #[test]
    fn assignee_named_any_is_not_the_sentinel() {
        let absent = list_cache_key(&ListQuery::default());
        let named_any = list_cache_key(&ListQuery::new(100, 0, TaskFilter::assignee("any")));
        assert_ne!(absent, named_any);
    }

    #[test]
    fn every_key_lives_in_the_namespace() {
        let query = ListQuery::new(1, 2, TaskFilter::completed(false));
        assert!(list_cache_key(&query).starts_with(LIST_KEY_PREFIX));
    }

    proptest! {
        #[test]
        fn distinct_queries_get_distinct_keys(
            limit_a in 1i64..200, offset_a in 0i64..50,
            completed_a in proptest::option::of(any::<bool>()),
            assignee_a in proptest::option::of("[a-z:=\" ]{1,8}"),
            limit_b in 1i64..200, offset_b in 0i64..50,
            completed_b in proptest::option::of(any::<bool>()),
            assignee_b in proptest::option::of("[a-z:=\" ]{1,8}"),
        ) {
            let a = ListQuery::new(limit_a, offset_a, TaskFilter { completed: completed_a, assignee: assignee_a });
            let b = ListQuery::new(limit_b, offset_b, TaskFilter { completed: completed_b, assignee: assignee_b });
            prop_assert_eq!(a == b, list_cache_key(&a) == list_cache_key(&b));
        }
    }
}
