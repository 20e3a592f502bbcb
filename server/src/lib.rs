//! HTTP boundary for the task service.
//!
//! `app` builds the router from an `AppState`; `main.rs` wires the state from
//! configuration, and tests drive the router directly with an in-memory store.

pub mod config;
pub mod error;
pub mod metrics;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::Deserialize;
use task_core::{
    CreateTaskRequest, ListQuery, Task, TaskFilter, TaskPage, TaskService, UpdateTaskRequest,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::metrics::RequestMetrics;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Carries `TaskPage::total` on list responses.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

#[derive(Clone)]
pub struct AppState {
    pub service: TaskService,
    pub metrics: Arc<RequestMetrics>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: TaskService) -> Self {
        Self {
            service,
            metrics: Arc::new(RequestMetrics::new()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/v1/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

/// Raw list parameters. Numbers are parsed by hand so that junk values fall
/// back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub completed: Option<String>,
    pub assignee: Option<String>,
}

impl ListParams {
    pub fn into_query(self) -> Result<ListQuery, ApiError> {
        let number = |value: Option<String>| {
            value
                .and_then(|value| value.trim().parse::<i64>().ok())
                .unwrap_or(0)
        };
        let completed = match self.completed.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(parse_bool(value).ok_or_else(|| {
                ApiError::bad_request(format!("invalid completed value: {value}"))
            })?),
        };
        let filter = TaskFilter {
            completed,
            assignee: self.assignee,
        };
        Ok(ListQuery::new(number(self.limit), number(self.offset), filter).normalized())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "t" => Some(true),
        "false" | "0" | "f" => Some(false),
        _ => None,
    }
}

async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(request) = payload?;
    let task = state.service.create(request.into_new_task()).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn list_tasks(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let page: TaskPage = state.service.list(params.into_query()?).await?;
    let total = HeaderValue::from(page.total);
    Ok(([(TOTAL_COUNT_HEADER, total)], Json(page)))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.service.get_by_id(&id).await?))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.service.update(request.into_patch(id)).await?))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics.render(state.service.gauge().get());
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params(limit: &str, offset: &str, completed: Option<&str>) -> ListParams {
        ListParams {
            limit: Some(limit.to_string()),
            offset: Some(offset.to_string()),
            completed: completed.map(str::to_string),
            assignee: None,
        }
    }

    #[rstest]
    #[case("10", "5", 10, 5)]
    #[case("abc", "xyz", 100, 0)]
    #[case("-3", "-3", 100, 0)]
    #[case("0", "0", 100, 0)]
    #[case("99999999999999999999", "1", 100, 1)]
    fn lenient_paging(
        #[case] limit: &str,
        #[case] offset: &str,
        #[case] expected_limit: i64,
        #[case] expected_offset: i64,
    ) {
        let query = params(limit, offset, None).into_query().unwrap();
        assert_eq!(query.limit, expected_limit);
        assert_eq!(query.offset, expected_offset);
    }

    #[rstest]
    #[case("true", Some(true))]
    #[case("FALSE", Some(false))]
    #[case("1", Some(true))]
    #[case("", None)]
    fn completed_filter(#[case] raw: &str, #[case] expected: Option<bool>) {
        let query = params("", "", Some(raw)).into_query().unwrap();
        assert_eq!(query.filter.completed, expected);
    }

    #[test]
    fn rejects_non_boolean_completed() {
        let error = params("", "", Some("maybe")).into_query().unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_assignee_is_no_filter() {
        let query = ListParams {
            assignee: Some(String::new()),
            ..ListParams::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(query.filter, TaskFilter::default());
    }
}
