//! The task record and the value types that flow between service and store.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::field::Field;

/// Page size applied when a list request asks for zero or fewer rows.
pub const DEFAULT_LIMIT: i64 = 100;

/// A persisted task as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to `TaskStore::create`. Timestamps are not part of it: the store
/// assigns them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    /// Generated by the store when `None`.
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(normalize_timestamp(due_date));
        self
    }

    pub(crate) fn into_task(self, id: String, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            assignee: self.assignee,
            completed: self.completed,
            due_date: self.due_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update. Only the provided fields are merged onto the stored
/// record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub id: String,
    /// `None` or an empty string leaves the title untouched.
    pub title: Option<String>,
    pub description: Field<String>,
    pub assignee: Field<String>,
    pub completed: Option<bool>,
    pub due_date: Field<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Merge onto `task`. Fails without touching `task` if a provided title
    /// trims to nothing.
    pub fn merge_into(self, task: &mut Task) -> Result<(), TaskError> {
        let title = match self.title {
            Some(raw) if !raw.is_empty() => Some(normalize_title(&raw)?),
            _ => None,
        };
        if let Some(title) = title {
            task.title = title;
        }
        self.description.apply_to(&mut task.description);
        self.assignee.apply_to(&mut task.assignee);
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        self.due_date
            .map(normalize_timestamp)
            .apply_to(&mut task.due_date);
        Ok(())
    }
}

/// Trim a title and reject it if nothing is left.
pub fn normalize_title(raw: &str) -> Result<String, TaskError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskError::InvalidInput("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// UTC, truncated to the microsecond precision Postgres stores.
pub fn normalize_timestamp(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(6)
}

pub(crate) fn timestamp_now() -> DateTime<Utc> {
    normalize_timestamp(Utc::now())
}

/// Optional list filters. An empty assignee means "no assignee filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub assignee: Option<String>,
}

/// The four filter combinations. Each one maps to its own query shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterShape<'a> {
    All,
    Completed(bool),
    Assignee(&'a str),
    CompletedAndAssignee(bool, &'a str),
}

impl TaskFilter {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            assignee: None,
        }
    }

    pub fn assignee(assignee: impl Into<String>) -> Self {
        Self {
            completed: None,
            assignee: Some(assignee.into()),
        }
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Drop an empty assignee so that it cannot produce a separate cache key
    /// or query shape.
    pub fn normalized(self) -> Self {
        Self {
            completed: self.completed,
            assignee: self.assignee.filter(|assignee| !assignee.is_empty()),
        }
    }

    pub fn shape(&self) -> FilterShape<'_> {
        let assignee = self.assignee.as_deref().filter(|a| !a.is_empty());
        match (self.completed, assignee) {
            (None, None) => FilterShape::All,
            (Some(completed), None) => FilterShape::Completed(completed),
            (None, Some(assignee)) => FilterShape::Assignee(assignee),
            (Some(completed), Some(assignee)) => {
                FilterShape::CompletedAndAssignee(completed, assignee)
            }
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self.shape() {
            FilterShape::All => true,
            FilterShape::Completed(completed) => task.completed == completed,
            FilterShape::Assignee(assignee) => task.assignee.as_deref() == Some(assignee),
            FilterShape::CompletedAndAssignee(completed, assignee) => {
                task.completed == completed && task.assignee.as_deref() == Some(assignee)
            }
        }
    }
}

/// A bounded, filtered list request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub limit: i64,
    pub offset: i64,
    pub filter: TaskFilter,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            filter: TaskFilter::default(),
        }
    }
}

impl ListQuery {
    pub fn new(limit: i64, offset: i64, filter: TaskFilter) -> Self {
        Self {
            limit,
            offset,
            filter,
        }
    }

    /// `limit <= 0` becomes `DEFAULT_LIMIT`, a negative offset becomes 0 and
    /// an empty assignee filter is dropped.
    pub fn normalized(self) -> Self {
        Self {
            limit: if self.limit <= 0 { DEFAULT_LIMIT } else { self.limit },
            offset: self.offset.max(0),
            filter: self.filter.normalized(),
        }
    }
}

/// One page of tasks plus the unbounded total for the same filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPage {
    pub items: Vec<Task>,
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rstest::rstest;

    fn sample_task() -> Task {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Task {
            id: "t-1".to_string(),
            title: "Write report".to_string(),
            description: Some("quarterly".to_string()),
            assignee: Some("alice".to_string()),
            completed: false,
            due_date: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case(" x ", "x")]
    #[case("x", "x")]
    #[case("\tplan sprint\n", "plan sprint")]
    fn normalize_title_trims(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_title(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\n\t")]
    fn normalize_title_rejects_blank(#[case] raw: &str) {
        assert!(matches!(
            normalize_title(raw),
            Err(TaskError::InvalidInput(_))
        ));
    }

    proptest! {
        #[test]
        fn padded_titles_trim_to_body(body in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,20}[a-zA-Z0-9]|[a-zA-Z0-9]", pad in 0usize..4) {
            let padded = format!("{}{}{}", " ".repeat(pad), body, " ".repeat(pad));
            prop_assert_eq!(normalize_title(&padded).unwrap(), body);
        }
    }

    #[test]
    fn patch_with_only_completed_keeps_other_fields() {
        let mut task = sample_task();
        let before = task.clone();
        let patch = TaskPatch {
            completed: Some(true),
            ..TaskPatch::new("t-1")
        };
        patch.merge_into(&mut task).unwrap();
        assert!(task.completed);
        assert_eq!(task.title, before.title);
        assert_eq!(task.description, before.description);
        assert_eq!(task.assignee, before.assignee);
        assert_eq!(task.due_date, before.due_date);
    }

    #[test]
    fn patch_with_empty_title_keeps_title() {
        let mut task = sample_task();
        let patch = TaskPatch {
            title: Some(String::new()),
            ..TaskPatch::new("t-1")
        };
        patch.merge_into(&mut task).unwrap();
        assert_eq!(task.title, "Write report");
    }

    #[test]
    fn patch_with_blank_title_is_rejected_and_leaves_task() {
        let mut task = sample_task();
        let before = task.clone();
        let patch = TaskPatch {
            title: Some("   ".to_string()),
            completed: Some(true),
            ..TaskPatch::new("t-1")
        };
        assert!(matches!(
            patch.merge_into(&mut task),
            Err(TaskError::InvalidInput(_))
        ));
        assert_eq!(task, before);
    }

    #[test]
    fn patch_clears_and_sets_optionals() {
        let mut task = sample_task();
        let patch = TaskPatch {
            description: Field::Clear,
            assignee: Field::Value("bob".to_string()),
            due_date: Field::Clear,
            ..TaskPatch::new("t-1")
        };
        patch.merge_into(&mut task).unwrap();
        assert_eq!(task.description, None);
        assert_eq!(task.assignee.as_deref(), Some("bob"));
        assert_eq!(task.due_date, None);
    }

    #[rstest]
    #[case(0, 0, DEFAULT_LIMIT, 0)]
    #[case(-3, -5, DEFAULT_LIMIT, 0)]
    #[case(10, 20, 10, 20)]
    fn list_query_normalization(
        #[case] limit: i64,
        #[case] offset: i64,
        #[case] expected_limit: i64,
        #[case] expected_offset: i64,
    ) {
        let query = ListQuery::new(limit, offset, TaskFilter::default()).normalized();
        assert_eq!(query.limit, expected_limit);
        assert_eq!(query.offset, expected_offset);
    }

    #[test]
    fn empty_assignee_filter_is_no_filter() {
        let filter = TaskFilter::assignee("");
        assert_eq!(filter.shape(), FilterShape::All);
        assert_eq!(filter.normalized().assignee, None);
    }

    #[test]
    fn filter_shapes_cover_all_four_cases() {
        assert_eq!(TaskFilter::default().shape(), FilterShape::All);
        assert_eq!(TaskFilter::completed(true).shape(), FilterShape::Completed(true));
        assert_eq!(TaskFilter::assignee("al").shape(), FilterShape::Assignee("al"));
        assert_eq!(
            TaskFilter::assignee("al").with_completed(false).shape(),
            FilterShape::CompletedAndAssignee(false, "al")
        );
    }

    #[test]
    fn filter_matches_task() {
        let task = sample_task();
        assert!(TaskFilter::default().matches(&task));
        assert!(TaskFilter::completed(false).matches(&task));
        assert!(!TaskFilter::completed(true).matches(&task));
        assert!(TaskFilter::assignee("alice").matches(&task));
        assert!(!TaskFilter::assignee("bob").with_completed(false).matches(&task));
    }

    #[test]
    fn normalize_timestamp_truncates_to_micros() {
        let value = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let normalized = normalize_timestamp(value);
        assert_eq!(normalized.timestamp_subsec_nanos(), 123_456_000);
    }
}
