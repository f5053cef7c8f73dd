// Human-facing rendering helpers for the CLI

use crate::models::{Category, Priority, Task};
use chrono::{DateTime, NaiveDate};
use colored::{ColoredString, Colorize};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Describe a due date relative to `now`
///
/// Whole-day difference, floored: "Today", "Tomorrow", "Yesterday",
/// "In N days" / "N days ago" within a week, otherwise the calendar date.
pub fn format_due(due_ms: i64, now_ms: i64) -> String {
    let days = due_ms.saturating_sub(now_ms).div_euclid(DAY_MS);
    match days {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        2..=7 => format!("In {} days", days),
        -7..=-2 => format!("{} days ago", -days),
        _ => format_date(due_ms),
    }
}

/// Calendar date (UTC) for a millisecond timestamp
pub fn format_date(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Parse `YYYY-MM-DD` as midnight UTC, in milliseconds
pub fn parse_date(input: &str) -> Result<i64, String> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}': {} (expected YYYY-MM-DD)", input, e))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| format!("Invalid date '{}'", input))
}

pub fn priority_label(priority: Priority) -> ColoredString {
    match priority {
        Priority::High => priority.as_str().red(),
        Priority::Medium => priority.as_str().yellow(),
        Priority::Low => priority.as_str().green(),
    }
}

pub fn category_label(category: Category) -> ColoredString {
    match category {
        Category::Work => category.as_str().blue(),
        Category::Personal => category.as_str().purple(),
        Category::Shopping => category.as_str().green(),
        Category::Health => category.as_str().red(),
        Category::Other => category.as_str().normal(),
    }
}

/// Short handle shown in listings (the random tail of the id)
pub fn short_id(id: &str) -> &str {
    let start = id.len().saturating_sub(8);
    id.get(start..).unwrap_or(id)
}

/// One-line summary of a task
pub fn render_task(task: &Task, now_ms: i64) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let text = if task.completed {
        task.text.dimmed().strikethrough()
    } else {
        task.text.normal()
    };

    let mut line = format!(
        "{} {} {}  ({}, {}, {})",
        check,
        short_id(&task.id).bright_black(),
        text,
        priority_label(task.priority),
        category_label(task.category),
        task.status
    );

    if let Some(due) = task.due_date {
        let due_text = format!("due {}", format_due(due, now_ms));
        if task.is_overdue(now_ms) {
            line.push_str(&format!(" {}", due_text.red().bold()));
        } else {
            line.push_str(&format!(" {}", due_text));
        }
    }

    for tag in &task.tags {
        line.push_str(&format!(" #{}", tag));
    }

    line
}
