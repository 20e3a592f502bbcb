//! Task records, their storage, and the list cache in front of it.
//!
//! # Overview
//! `TaskService` is the entry point: it validates input, merges partial
//! updates and keeps the task gauge current. It talks to a `TaskStore`,
//! which is either Postgres or in-memory, optionally wrapped in a
//! `CachedTaskStore` that serves list queries from Redis.
//!
//! # Design
//! - Optional fields on updates are tri-state (`Field`), so "not sent",
//!   "cleared" and "set" never collapse into each other.
//! - The cache is attached once, at construction, and is never the source
//!   of truth: any cache failure falls back to the store.
//! - Errors are `TaskError`; cache errors stay inside the cache layer.

pub mod cache;
pub mod dto;
pub mod error;
pub mod field;
pub mod metrics;
pub mod service;
pub mod store;
pub mod task;

pub use cache::{CachedTaskStore, InMemoryListCache, ListCache, RedisListCache};
pub use dto::{CreateTaskRequest, UpdateTaskRequest};
pub use error::TaskError;
pub use field::Field;
pub use metrics::TaskGauge;
pub use service::TaskService;
pub use store::{InMemoryTaskStore, PostgresTaskStore, TaskStore};
pub use task::{ListQuery, NewTask, Task, TaskFilter, TaskPage, TaskPatch, DEFAULT_LIMIT};
