//! `TaskStore` decorator implementing cache-aside for `list`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{
    list_cache_key, CacheError, ListCache, DEFAULT_CACHE_OP_TIMEOUT, DEFAULT_LIST_TTL,
    LIST_KEY_PREFIX,
};
use crate::error::TaskError;
use crate::store::TaskStore;
use crate::task::{ListQuery, NewTask, Task, TaskFilter};

/// Wraps a store with an optional list cache.
///
/// Reads: cache hit is returned as-is; miss or cache failure reads the store
/// and writes the page back (best effort). Writes: after the store succeeds,
/// the whole list namespace is flushed (best effort). Cache errors, including
/// calls that outlive `op_timeout`, are logged at `warn` and never returned.
pub struct CachedTaskStore<S> {
    store: S,
    cache: Option<Arc<dyn ListCache>>,
    ttl: Duration,
    op_timeout: Duration,
}

impl<S: TaskStore> CachedTaskStore<S> {
    pub fn new(store: S, cache: Option<Arc<dyn ListCache>>) -> Self {
        Self {
            store,
            cache,
            ttl: DEFAULT_LIST_TTL,
            op_timeout: DEFAULT_CACHE_OP_TIMEOUT,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.op_timeout, operation)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }

    async fn cached_page(
        &self,
        cache: &dyn ListCache,
        key: &str,
    ) -> Result<Option<Vec<Task>>, CacheError> {
        match self.bounded(cache.get(key)).await? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|error| CacheError::Serialization(error.to_string())),
            None => Ok(None),
        }
    }

    async fn store_page(&self, cache: &dyn ListCache, key: &str, tasks: &[Task]) {
        let json = match serde_json::to_string(tasks) {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(cache_key = %key, %error, "failed to serialize list page for cache");
                return;
            }
        };
        if let Err(error) = self.bounded(cache.set(key, &json, self.ttl)).await {
            tracing::warn!(cache_key = %key, %error, "failed to populate list cache");
        }
    }

    async fn invalidate_lists(&self) {
        let Some(cache) = self.cache.as_deref() else {
            return;
        };
        match self.bounded(cache.invalidate_prefix(LIST_KEY_PREFIX)).await {
            Ok(removed) => tracing::debug!(removed, "list cache invalidated"),
            Err(error) => tracing::warn!(%error, "list cache invalidation failed"),
        }
    }
}

#[async_trait]
impl<S: TaskStore> TaskStore for CachedTaskStore<S> {
    async fn create(&self, task: NewTask) -> Result<Task, TaskError> {
        let task = self.store.create(task).await?;
        self.invalidate_lists().await;
        Ok(task)
    }

    async fn get_by_id(&self, id: &str) -> Result<Task, TaskError> {
        self.store.get_by_id(id).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Task>, TaskError> {
        let query = query.clone().normalized();
        let Some(cache) = self.cache.as_deref() else {
            return self.store.list(&query).await;
        };

        let key = list_cache_key(&query);
        match self.cached_page(cache, &key).await {
            Ok(Some(tasks)) => {
                tracing::debug!(cache_key = %key, "list cache hit");
                return Ok(tasks);
            }
            Ok(None) => tracing::debug!(cache_key = %key, "list cache miss"),
            Err(error) => {
                tracing::warn!(cache_key = %key, %error, "list cache read failed, reading store");
            }
        }

        let tasks = self.store.list(&query).await?;
        self.store_page(cache, &key, &tasks).await;
        Ok(tasks)
    }

    async fn update(&self, task: &Task) -> Result<(), TaskError> {
        self.store.update(task).await?;
        self.invalidate_lists().await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, TaskError> {
        let deleted = self.store.delete(id).await?;
        if deleted {
            self.invalidate_lists().await;
        }
        Ok(deleted)
    }

    async fn count(&self) -> Result<i64, TaskError> {
        self.store.count().await
    }

    async fn count_filtered(&self, filter: &TaskFilter) -> Result<i64, TaskError> {
        self.store.count_filtered(filter).await
    }
}
