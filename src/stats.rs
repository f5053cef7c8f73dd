// Aggregate statistics over the full task collection

use crate::models::{Category, Priority, Task};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub high_priority: usize,
    pub overdue: usize,
    /// Every category is present, zero when unused
    pub by_category: BTreeMap<Category, usize>,
    /// Every priority is present, zero when unused
    pub by_priority: BTreeMap<Priority, usize>,
}

impl Stats {
    /// Compute statistics; `now` (ms since epoch) decides what is overdue
    pub fn compute(tasks: &[Task], now: i64) -> Self {
        let mut by_category: BTreeMap<Category, usize> = Category::ALL.into_iter().map(|c| (c, 0)).collect();
        let mut by_priority: BTreeMap<Priority, usize> = Priority::ALL.into_iter().map(|p| (p, 0)).collect();

        let mut completed = 0;
        let mut overdue = 0;
        for task in tasks {
            if task.completed {
                completed += 1;
            }
            if task.is_overdue(now) {
                overdue += 1;
            }
            *by_category.entry(task.category).or_default() += 1;
            *by_priority.entry(task.priority).or_default() += 1;
        }

        Self {
            total: tasks.len(),
            completed,
            active: tasks.len() - completed,
            high_priority: by_priority[&Priority::High],
            overdue,
            by_category,
            by_priority,
        }
    }

    /// Completed share as a whole percentage, 0 for an empty collection
    pub fn completion_rate(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }
}
