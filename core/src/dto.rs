//! Wire shapes for inbound create and update requests.
//!
//! # Design
//! These are shared by the server (decoding) and the client (encoding), so
//! both sides agree on the tri-state rules:
//!
//! - `description`: missing leaves it alone, `null` or `""` clears it, any
//!   other string sets it.
//! - `assignee`: missing or `""` leaves it alone, `null` clears it, any
//!   other string sets it.
//! - `due_date`: missing leaves it alone, `null` clears it, a timestamp in
//!   any offset sets it (stored as UTC).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::task::{normalize_timestamp, NewTask, TaskPatch};

/// Request payload for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTaskRequest {
    /// Empty optional strings are stored as no value.
    pub fn into_new_task(self) -> NewTask {
        NewTask {
            id: None,
            title: self.title,
            description: self.description.filter(|value| !value.is_empty()),
            assignee: self.assignee.filter(|value| !value.is_empty()),
            completed: false,
            due_date: self.due_date.map(normalize_timestamp),
        }
    }
}

/// Request payload for a partial update. Only the keys present in the JSON
/// are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub description: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub assignee: Field<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub due_date: Field<DateTime<Utc>>,
}

impl UpdateTaskRequest {
    pub fn into_patch(self, id: impl Into<String>) -> TaskPatch {
        TaskPatch {
            id: id.into(),
            title: self.title,
            description: self.description.empty_as_clear(),
            assignee: self.assignee.empty_as_unset(),
            completed: self.completed,
            due_date: self.due_date.map(normalize_timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn create_requires_title() {
        let result: Result<CreateTaskRequest, _> = serde_json::from_str(r#"{"assignee":"al"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn create_drops_empty_optionals() {
        let request: CreateTaskRequest =
            serde_json::from_str(r#"{"title":"t","description":"","assignee":""}"#).unwrap();
        let task = request.into_new_task();
        assert_eq!(task.description, None);
        assert_eq!(task.assignee, None);
        assert!(!task.completed);
    }

    #[test]
    fn create_normalizes_due_date_to_utc() {
        let request: CreateTaskRequest =
            serde_json::from_str(r#"{"title":"t","due_date":"2025-06-01T10:00:00+02:00"}"#)
                .unwrap();
        assert_eq!(
            request.into_new_task().due_date,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn update_empty_body_changes_nothing() {
        let request: UpdateTaskRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.into_patch("id"), TaskPatch::new("id"));
    }

    #[test]
    fn update_description_states() {
        let clear: UpdateTaskRequest = serde_json::from_str(r#"{"description":""}"#).unwrap();
        assert_eq!(clear.into_patch("id").description, Field::Clear);

        let null: UpdateTaskRequest = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(null.into_patch("id").description, Field::Clear);

        let set: UpdateTaskRequest = serde_json::from_str(r#"{"description":"d"}"#).unwrap();
        assert_eq!(set.into_patch("id").description, Field::Value("d".to_string()));
    }

    #[test]
    fn update_assignee_states() {
        let empty: UpdateTaskRequest = serde_json::from_str(r#"{"assignee":""}"#).unwrap();
        assert_eq!(empty.into_patch("id").assignee, Field::Unset);

        let null: UpdateTaskRequest = serde_json::from_str(r#"{"assignee":null}"#).unwrap();
        assert_eq!(null.into_patch("id").assignee, Field::Clear);

        let set: UpdateTaskRequest = serde_json::from_str(r#"{"assignee":"bo"}"#).unwrap();
        assert_eq!(set.into_patch("id").assignee, Field::Value("bo".to_string()));
    }

    #[test]
    fn update_serializes_only_present_keys() {
        let request = UpdateTaskRequest {
            completed: Some(true),
            description: Field::Clear,
            ..UpdateTaskRequest::default()
        };
        let json: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"completed": true, "description": null}));
    }

    #[test]
    fn update_rejects_wrong_types() {
        let result: Result<UpdateTaskRequest, _> =
            serde_json::from_str(r#"{"completed":"yes"}"#);
        assert!(result.is_err());
    }
}
