// View state and the filter -> search -> sort derivation over tasks

use crate::models::{Category, Priority, Task};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Completion selector: all / active / completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl CompletionFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionFilter::All => "all",
            CompletionFilter::Active => "active",
            CompletionFilter::Completed => "completed",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            CompletionFilter::All => true,
            CompletionFilter::Active => !task.completed,
            CompletionFilter::Completed => task.completed,
        }
    }
}

impl fmt::Display for CompletionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(CompletionFilter::All),
            "active" | "pending" => Ok(CompletionFilter::Active),
            "completed" | "done" => Ok(CompletionFilter::Completed),
            _ => Err(format!("Unknown filter: {}", s)),
        }
    }
}

/// Either every value, or only one specific value
///
/// Serialized as the string `"all"` or as the selected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<T> {
    All,
    Only(T),
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Selector::All
    }
}

impl<T: PartialEq> Selector<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(wanted) => wanted == value,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => f.write_str("all"),
            Selector::Only(v) => v.fmt(f),
        }
    }
}

impl<T> FromStr for Selector<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Selector::All);
        }
        s.parse::<T>().map(Selector::Only).map_err(|e| e.to_string())
    }
}

impl<T: Serialize> Serialize for Selector<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selector::All => serializer.serialize_str("all"),
            Selector::Only(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T> Deserialize<'de> for Selector<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Sort key for the derived view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Priority,
    DueDate,
    Alphabetical,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::Priority => "priority",
            SortKey::DueDate => "due_date",
            SortKey::Alphabetical => "alphabetical",
        }
    }

    /// Ascending comparison of two tasks under this key
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortKey::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Alphabetical => a
                .text
                .to_lowercase()
                .cmp(&b.text.to_lowercase())
                .then_with(|| a.text.cmp(&b.text)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "created_at" | "createdat" | "created" => Ok(SortKey::CreatedAt),
            "priority" => Ok(SortKey::Priority),
            "due_date" | "duedate" | "due" => Ok(SortKey::DueDate),
            "alphabetical" | "alpha" | "text" => Ok(SortKey::Alphabetical),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(format!("Unknown sort order: {}", s)),
        }
    }
}

/// Store-wide view selectors, combined with AND
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub filter: CompletionFilter,
    pub search_query: String,
    pub category: Selector<Category>,
    pub priority: Selector<Priority>,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
}

impl ViewState {
    fn matches(&self, task: &Task, lowered_query: &str) -> bool {
        self.filter.matches(task)
            && (lowered_query.is_empty() || task.matches_query(lowered_query))
            && self.category.matches(&task.category)
            && self.priority.matches(&task.priority)
    }
}

/// Produce the visible, ordered tasks for a view
///
/// Pure: no mutation, same input gives the same output. The sort is stable,
/// so ties keep collection order (newest first).
pub fn derive<'a>(tasks: &'a [Task], view: &ViewState) -> Vec<&'a Task> {
    let query = view.search_query.to_lowercase();

    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|task| view.matches(task, &query))
        .collect();

    visible.sort_by(|a, b| view.sort_order.apply(view.sort_by.compare(a, b)));
    visible
}
