//! In-process `TaskStore` used by tests and `STORAGE_MODE=in_memory`.
//!
//! All access goes through one mutex per store instance. The lock is never
//! held across an await point other than its own acquisition.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::TaskError;
use crate::store::{generate_id, TaskStore};
use crate::task::{timestamp_now, ListQuery, NewTask, Task, TaskFilter};

#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<Mutex<HashMap<String, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; ties broken by id so that pages are stable.
fn newest_first(a: &Task, b: &Task) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: NewTask) -> Result<Task, TaskError> {
        let id = task.id.clone().unwrap_or_else(generate_id);
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&id) {
            return Err(TaskError::Persistence(format!("duplicate task id: {id}")));
        }
        let task = task.into_task(id.clone(), timestamp_now());
        tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn get_by_id(&self, id: &str) -> Result<Task, TaskError> {
        let tasks = self.tasks.lock().await;
        tasks
            .get(id)
            .cloned()
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Task>, TaskError> {
        let query = query.clone().normalized();
        let tasks = self.tasks.lock().await;
        let mut matching: Vec<&Task> = tasks
            .values()
            .filter(|task| query.filter.matches(task))
            .collect();
        matching.sort_by(|a, b| newest_first(a, b));
        Ok(matching
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn update(&self, task: &Task) -> Result<(), TaskError> {
        let mut tasks = self.tasks.lock().await;
        let stored = tasks
            .get_mut(&task.id)
            .ok_or_else(|| TaskError::NotFound(task.id.clone()))?;
        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.assignee = task.assignee.clone();
        stored.completed = task.completed;
        stored.due_date = task.due_date;
        stored.updated_at = timestamp_now().max(stored.created_at);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, TaskError> {
        Ok(self.tasks.lock().await.remove(id).is_some())
    }

    async fn count_filtered(&self, filter: &TaskFilter) -> Result<i64, TaskError> {
        let tasks = self.tasks.lock().await;
        let count = tasks.values().filter(|task| filter.matches(task)).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}
