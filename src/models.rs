// Data models for TodoStore

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task priority, ordered low < medium < high
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Numeric rank used for sorting (high=3, medium=2, low=1)
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

/// Workflow status; `Completed` mirrors `Task::completed`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Personal,
    Shopping,
    Health,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Personal,
        Category::Shopping,
        Category::Health,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Personal => "personal",
            Category::Shopping => "shopping",
            Category::Health => "health",
            Category::Other => "other",
        }
    }
}

macro_rules! impl_str_enum {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase().replace('-', "_");
                $ty::ALL
                    .into_iter()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| format!("Unknown {}: {}", $what, s))
            }
        }
    };
}

impl_str_enum!(Priority, "priority");
impl_str_enum!(Status, "status");
impl_str_enum!(Category, "category");

/// A single tracked item of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Optional attributes for a new task; unset fields take the defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOptions {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub due_date: Option<i64>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl TaskOptions {
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn due_date(mut self, due_ms: i64) -> Self {
        self.due_date = Some(due_ms);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

/// Partial update applied to an existing task
///
/// `due_date` is doubly optional: `Some(None)` clears the due date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub due_date: Option<Option<i64>>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Drop `text` when it trims to nothing
    pub fn without_blank_text(mut self) -> Self {
        if self.text.as_deref().is_some_and(|text| clean_text(text).is_none()) {
            self.text = None;
        }
        self
    }
}

impl Task {
    /// Build a task from already-trimmed text
    pub fn new(id: String, text: String, options: TaskOptions, now: i64) -> Self {
        let status = options.status.unwrap_or_default();
        Self {
            id,
            text,
            completed: status == Status::Completed,
            status,
            priority: options.priority.unwrap_or_default(),
            category: options.category.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            due_date: options.due_date,
            description: options.description.unwrap_or_default(),
            tags: options.tags.unwrap_or_default(),
        }
    }

    pub fn touch(&mut self, now: i64) {
        self.updated_at = now;
    }

    /// Set completion and keep `status` in step
    pub fn set_completed(&mut self, completed: bool, now: i64) {
        self.completed = completed;
        self.status = if completed { Status::Completed } else { Status::Pending };
        self.touch(now);
    }

    /// Set status and keep `completed` in step
    pub fn set_status(&mut self, status: Status, now: i64) {
        self.status = status;
        self.completed = status == Status::Completed;
        self.touch(now);
    }

    /// Apply every present field of `patch`; returns false when nothing applied
    ///
    /// Blank text counts as absent, so a patch holding only blank text leaves
    /// the task and its `updated_at` untouched.
    pub fn apply(&mut self, patch: TaskPatch, now: i64) -> bool {
        let patch = patch.without_blank_text();
        if patch.is_empty() {
            return false;
        }
        if let Some(text) = patch.text.as_deref().and_then(clean_text) {
            self.text = text;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(status) = patch.status {
            self.status = status;
            self.completed = status == Status::Completed;
        }
        self.touch(now);
        true
    }

    /// Restore `completed`/`status` agreement on records written by older clients,
    /// which only tracked `completed`
    pub fn reconcile_status(&mut self) {
        if self.completed {
            self.status = Status::Completed;
        } else if self.status == Status::Completed {
            self.status = Status::Pending;
        }
    }

    /// Case-insensitive substring match on text, description or any tag.
    /// `query` must already be lowercase.
    pub fn matches_query(&self, query: &str) -> bool {
        self.text.to_lowercase().contains(query)
            || self.description.to_lowercase().contains(query)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(query))
    }

    pub fn is_overdue(&self, now: i64) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now)
    }
}

/// Trim task text, rejecting empty input
pub fn clean_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Fresh task identifier
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
