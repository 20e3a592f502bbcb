//! Persistent task storage.
//!
//! # Design
//! `TaskStore` is the capability contract the service depends on. There is
//! one production implementation (`PostgresTaskStore`), one in-process
//! implementation for tests and local runs (`InMemoryTaskStore`), and one
//! decorator (`cache::CachedTaskStore`) that adds list caching in front of
//! either.
//!
//! Every method is a single round trip; none of them hold an
//! application-level lock across an await on network I/O.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::task::{ListQuery, NewTask, Task, TaskFilter};

pub use memory::InMemoryTaskStore;
pub use postgres::PostgresTaskStore;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task. Assigns an id when none is given and sets both
    /// timestamps to the current time.
    async fn create(&self, task: NewTask) -> Result<Task, TaskError>;

    async fn get_by_id(&self, id: &str) -> Result<Task, TaskError>;

    /// Newest first. `query` is normalized before use, so callers may pass
    /// raw values.
    async fn list(&self, query: &ListQuery) -> Result<Vec<Task>, TaskError>;

    /// Replace the mutable fields of the task with `task.id` and refresh
    /// `updated_at`. `NotFound` when no row matched.
    async fn update(&self, task: &Task) -> Result<(), TaskError>;

    /// Returns whether a task was actually removed.
    async fn delete(&self, id: &str) -> Result<bool, TaskError>;

    async fn count(&self) -> Result<i64, TaskError> {
        self.count_filtered(&TaskFilter::default()).await
    }

    /// Same filter semantics as `list`, without limit or offset.
    async fn count_filtered(&self, filter: &TaskFilter) -> Result<i64, TaskError>;
}

pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
