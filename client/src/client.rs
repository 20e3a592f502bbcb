//! Stateless HTTP request builder and response parser for the task API.

use serde_json::Value;
use task_core::{CreateTaskRequest, ListQuery, Task, TaskPage, UpdateTaskRequest};
use url::Url;

use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

const TASKS_PATH: [&str; 3] = ["api", "v1", "tasks"];

/// Synchronous, stateless client for the task API.
///
/// The caller is responsible for executing the HTTP round trip between
/// `build_*` and `parse_*`.
#[derive(Debug, Clone)]
pub struct TaskClient {
    base_url: Url,
}

impl TaskClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { base_url })
    }

    pub fn build_health(&self) -> HttpRequest {
        request(HttpMethod::Get, self.url(&["health"]), None)
    }

    /// Only non-default paging values and set filters go on the query string.
    pub fn build_list_tasks(&self, query: &ListQuery) -> HttpRequest {
        let mut url = self.url(&TASKS_PATH);
        {
            let mut pairs = url.query_pairs_mut();
            if query.limit > 0 {
                pairs.append_pair("limit", &query.limit.to_string());
            }
            if query.offset > 0 {
                pairs.append_pair("offset", &query.offset.to_string());
            }
            if let Some(completed) = query.filter.completed {
                pairs.append_pair("completed", if completed { "true" } else { "false" });
            }
            if let Some(assignee) = query.filter.assignee.as_deref().filter(|a| !a.is_empty()) {
                pairs.append_pair("assignee", assignee);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        request(HttpMethod::Get, url, None)
    }

    pub fn build_get_task(&self, id: &str) -> HttpRequest {
        request(HttpMethod::Get, self.task_url(id), None)
    }

    pub fn build_create_task(&self, input: &CreateTaskRequest) -> Result<HttpRequest, ClientError> {
        let body = to_json(input)?;
        Ok(request(HttpMethod::Post, self.url(&TASKS_PATH), Some(body)))
    }

    pub fn build_update_task(
        &self,
        id: &str,
        input: &UpdateTaskRequest,
    ) -> Result<HttpRequest, ClientError> {
        let body = to_json(input)?;
        Ok(request(HttpMethod::Put, self.task_url(id), Some(body)))
    }

    pub fn build_delete_task(&self, id: &str) -> HttpRequest {
        request(HttpMethod::Delete, self.task_url(id), None)
    }

    pub fn parse_health(&self, response: HttpResponse) -> Result<(), ClientError> {
        check_status(&response, 200)?;
        let body: Value = from_json(&response.body)?;
        match body.get("status").and_then(Value::as_str) {
            Some("ok") => Ok(()),
            _ => Err(ClientError::Http {
                status: response.status,
                body: response.body,
            }),
        }
    }

    pub fn parse_list_tasks(&self, response: HttpResponse) -> Result<TaskPage, ClientError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }

    pub fn parse_get_task(&self, response: HttpResponse) -> Result<Task, ClientError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }

    pub fn parse_create_task(&self, response: HttpResponse) -> Result<Task, ClientError> {
        check_status(&response, 201)?;
        from_json(&response.body)
    }

    pub fn parse_update_task(&self, response: HttpResponse) -> Result<Task, ClientError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }

    pub fn parse_delete_task(&self, response: HttpResponse) -> Result<(), ClientError> {
        check_status(&response, 204)
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn task_url(&self, id: &str) -> Url {
        let mut segments = TASKS_PATH.to_vec();
        segments.push(id);
        self.url(&segments)
    }
}

fn request(method: HttpMethod, url: Url, body: Option<String>) -> HttpRequest {
    let headers = match body {
        Some(_) => vec![("content-type".to_string(), "application/json".to_string())],
        None => Vec::new(),
    };
    HttpRequest {
        method,
        url: url.into(),
        headers,
        body,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ClientError> {
    serde_json::to_string(value).map_err(|error| ClientError::Serialization(error.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|error| ClientError::Deserialization(error.to_string()))
}

/// Map unexpected status codes to the matching `ClientError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ClientError> {
    match response.status {
        status if status == expected => Ok(()),
        404 => Err(ClientError::NotFound),
        400 => Err(ClientError::BadRequest(error_message(&response.body))),
        status => Err(ClientError::Http {
            status,
            body: response.body.clone(),
        }),
    }
}

/// The `error` field of a JSON error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
