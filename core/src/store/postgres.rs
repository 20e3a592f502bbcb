//! `PostgreSQL` implementation of `TaskStore`, built on `sqlx::PgPool`.
//!
//! # Table Schema
//!
//! See [`SCHEMA`]. Ids are stored as `TEXT` so that they stay opaque: an id
//! that is not a UUID is simply not found rather than a type error.
//!
//! # Filters
//!
//! Each of the four `FilterShape`s has its own statement, so that every
//! combination is a plain prepared query with a fixed parameter list.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use crate::error::TaskError;
use crate::store::{generate_id, TaskStore};
use crate::task::{timestamp_now, FilterShape, ListQuery, NewTask, Task, TaskFilter};

/// Idempotent DDL applied at startup.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS tasks (
  id TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  description TEXT,
  assignee TEXT,
  completed BOOLEAN NOT NULL DEFAULT FALSE,
  due_date TIMESTAMPTZ,
  created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
  updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_tasks_completed ON tasks (completed);
CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks (created_at DESC);

CREATE OR REPLACE FUNCTION trg_set_updated_at()
RETURNS TRIGGER AS $$
BEGIN
  NEW.updated_at = GREATEST(now(), NEW.created_at);
  RETURN NEW;
END;
$$ LANGUAGE plpgsql;

DO $$
BEGIN
  IF NOT EXISTS (
    SELECT 1 FROM pg_trigger WHERE tgname = 'trg_tasks_set_updated_at'
  ) THEN
    CREATE TRIGGER trg_tasks_set_updated_at
      BEFORE UPDATE ON tasks
      FOR EACH ROW
      EXECUTE FUNCTION trg_set_updated_at();
  END IF;
END;
$$;
";

const INSERT_TASK: &str = "INSERT INTO tasks \
    (id, title, description, assignee, completed, due_date, created_at, updated_at) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

const SELECT_TASK: &str = "SELECT id, title, description, assignee, completed, due_date, \
    created_at, updated_at FROM tasks WHERE id = $1";

const UPDATE_TASK: &str = "UPDATE tasks SET title = $1, description = $2, assignee = $3, \
    completed = $4, due_date = $5, updated_at = $6 WHERE id = $7";

const DELETE_TASK: &str = "DELETE FROM tasks WHERE id = $1";

/// Statement for one page of tasks. Filter parameters come first, then
/// `LIMIT` and `OFFSET`.
pub(crate) const fn list_sql(shape: FilterShape<'_>) -> &'static str {
    match shape {
        FilterShape::All => {
            "SELECT id, title, description, assignee, completed, due_date, created_at, updated_at \
             FROM tasks ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        }
        FilterShape::Completed(_) => {
            "SELECT id, title, description, assignee, completed, due_date, created_at, updated_at \
             FROM tasks WHERE completed = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        }
        FilterShape::Assignee(_) => {
            "SELECT id, title, description, assignee, completed, due_date, created_at, updated_at \
             FROM tasks WHERE assignee = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        }
        FilterShape::CompletedAndAssignee(_, _) => {
            "SELECT id, title, description, assignee, completed, due_date, created_at, updated_at \
             FROM tasks WHERE completed = $1 AND assignee = $2 \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        }
    }
}

pub(crate) const fn count_sql(shape: FilterShape<'_>) -> &'static str {
    match shape {
        FilterShape::All => "SELECT COUNT(*) FROM tasks",
        FilterShape::Completed(_) => "SELECT COUNT(*) FROM tasks WHERE completed = $1",
        FilterShape::Assignee(_) => "SELECT COUNT(*) FROM tasks WHERE assignee = $1",
        FilterShape::CompletedAndAssignee(_, _) => {
            "SELECT COUNT(*) FROM tasks WHERE completed = $1 AND assignee = $2"
        }
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: String,
    title: String,
    description: Option<String>,
    assignee: Option<String>,
    completed: bool,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            title: row.title,
            description: row.description,
            assignee: row.assignee,
            completed: row.completed,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`. Connection acquisition is bounded
    /// by `acquire_timeout` so a dead database fails requests instead of
    /// hanging them.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, TaskError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply [`SCHEMA`]. Safe to run on every start.
    pub async fn ensure_schema(&self) -> Result<(), TaskError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn create(&self, task: NewTask) -> Result<Task, TaskError> {
        let id = task.id.clone().unwrap_or_else(generate_id);
        let task = task.into_task(id, timestamp_now());

        sqlx::query(INSERT_TASK)
            .bind(&task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(&task.assignee)
            .bind(task.completed)
            .bind(task.due_date)
            .bind(task.created_at)
            .bind(task.updated_at)
            .execute(&self.pool)
            .await?;

        Ok(task)
    }

    async fn get_by_id(&self, id: &str) -> Result<Task, TaskError> {
        sqlx::query_as::<_, TaskRow>(SELECT_TASK)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Task::from)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Task>, TaskError> {
        let query = query.clone().normalized();
        let shape = query.filter.shape();

        let statement = sqlx::query_as::<_, TaskRow>(list_sql(shape));
        let statement = match shape {
            FilterShape::All => statement,
            FilterShape::Completed(completed) => statement.bind(completed),
            FilterShape::Assignee(assignee) => statement.bind(assignee),
            FilterShape::CompletedAndAssignee(completed, assignee) => {
                statement.bind(completed).bind(assignee)
            }
        };

        let rows = statement
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn update(&self, task: &Task) -> Result<(), TaskError> {
        let result = sqlx::query(UPDATE_TASK)
            .bind(&task.title)
            .bind(&task.description)
            .bind(&task.assignee)
            .bind(task.completed)
            .bind(task.due_date)
            .bind(timestamp_now())
            .bind(&task.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound(task.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, TaskError> {
        let result = sqlx::query(DELETE_TASK)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_filtered(&self, filter: &TaskFilter) -> Result<i64, TaskError> {
        let shape = filter.shape();
        let statement = sqlx::query_as::<_, (i64,)>(count_sql(shape));
        let statement = match shape {
            FilterShape::All => statement,
            FilterShape::Completed(completed) => statement.bind(completed),
            FilterShape::Assignee(assignee) => statement.bind(assignee),
            FilterShape::CompletedAndAssignee(completed, assignee) => {
                statement.bind(completed).bind(assignee)
            }
        };
        let (count,) = statement.fetch_one(&self.pool).await?;
        Ok(count)
    }
}
