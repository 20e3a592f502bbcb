//! Synchronous API client for the task service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round trip, so the client is deterministic and testable.
//!
//! # Design
//! - `TaskClient` is stateless: it holds only the base URL.
//! - Each operation is split into `build_*` (produces a request) and
//!   `parse_*` (consumes a response), so the I/O boundary is explicit.
//! - Payload and record types come from `task_core`, so client and server
//!   cannot drift apart on the wire format.

pub mod client;
pub mod error;
pub mod http;

pub use client::TaskClient;
pub use error::ClientError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use task_core::{
    CreateTaskRequest, Field, ListQuery, Task, TaskFilter, TaskPage, UpdateTaskRequest,
};
