//! Error taxonomy shared by the store and service layers.
//!
//! # Design
//! `InvalidInput` and `NotFound` are client-correctable and travel unchanged
//! up to the HTTP boundary. `Persistence` carries the backend's message for
//! logging only; the boundary never echoes it to clients. Cache failures have
//! their own type (`cache::CacheError`) and never leave the cache layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    /// Validation failure, e.g. a blank title.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No task exists with this id.
    #[error("task not found: {0}")]
    NotFound(String),

    /// The store is unreachable, or rejected the write.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for TaskError {
    fn from(error: sqlx::Error) -> Self {
        TaskError::Persistence(error.to_string())
    }
}
