//! Error types for the task API client.
//!
//! # Design
//! `NotFound` and `BadRequest` get dedicated variants because callers react
//! to them differently: one means the id is gone, the other that the input
//! needs fixing. Any other unexpected status lands in `Http` with the raw
//! status code and body.

use thiserror::Error;

/// Errors returned by `TaskClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server returned 404: the requested task does not exist.
    #[error("task not found")]
    NotFound,

    /// The server returned 400, with the message from its error body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Any other status the operation does not expect.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The base URL cannot have paths appended to it.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<url::ParseError> for ClientError {
    fn from(error: url::ParseError) -> Self {
        ClientError::InvalidUrl(error.to_string())
    }
}
