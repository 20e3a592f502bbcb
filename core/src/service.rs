//! Business rules on top of a `TaskStore`.
//!
//! # Design
//! `TaskService` is the only layer that rejects input. It trims and checks
//! titles, merges partial updates onto the stored record, and keeps the
//! task gauge in step with successful creates and deletes. It is cheap to
//! share: the store and gauge are both behind `Arc`.

use std::sync::Arc;

use crate::error::TaskError;
use crate::metrics::TaskGauge;
use crate::store::TaskStore;
use crate::task::{normalize_title, ListQuery, NewTask, Task, TaskPage, TaskPatch};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    gauge: Arc<TaskGauge>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, gauge: Arc<TaskGauge>) -> Self {
        Self { store, gauge }
    }

    pub fn gauge(&self) -> &Arc<TaskGauge> {
        &self.gauge
    }

    pub async fn create(&self, mut task: NewTask) -> Result<Task, TaskError> {
        task.title = normalize_title(&task.title)?;
        let task = self.store.create(task).await?;
        self.gauge.increment();
        tracing::info!(task_id = %task.id, "task created");
        Ok(task)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Task, TaskError> {
        self.store.get_by_id(id).await
    }

    /// One page plus the total for the same filters. The two reads run
    /// concurrently and are not a consistent snapshot; if either fails the
    /// other is dropped.
    pub async fn list(&self, query: ListQuery) -> Result<TaskPage, TaskError> {
        let query = query.normalized();
        let (items, total) = tokio::try_join!(
            self.store.list(&query),
            self.store.count_filtered(&query.filter)
        )?;
        Ok(TaskPage {
            items,
            limit: query.limit,
            offset: query.offset,
            total,
        })
    }

    /// Load, merge, persist, then read back so the result reflects anything
    /// the store normalized (such as `updated_at`).
    pub async fn update(&self, patch: TaskPatch) -> Result<Task, TaskError> {
        let id = patch.id.clone();
        let mut task = self.store.get_by_id(&id).await?;
        patch.merge_into(&mut task)?;
        self.store.update(&task).await?;
        let updated = self.store.get_by_id(&id).await?;
        tracing::info!(task_id = %id, "task updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), TaskError> {
        if !self.store.delete(id).await? {
            return Err(TaskError::NotFound(id.to_string()));
        }
        self.gauge.decrement();
        tracing::info!(task_id = %id, "task deleted");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, TaskError> {
        self.store.count().await
    }

    /// Reset the gauge from a full recount.
    pub async fn refresh_gauge(&self) -> Result<i64, TaskError> {
        let count = self.store.count().await?;
        self.gauge.set(count);
        Ok(count)
    }
}
