//! View-model projection of the task collection.
//!
//! Nothing here touches a UI toolkit: the presentation layer binds these
//! plain structures to whatever surface it draws on.

use crate::filter::{FilterCriteria, filter_tasks};
use crate::model::{Priority, Task};
use serde::Serialize;
use std::collections::BTreeSet;
use std::f64::consts::PI;
use time::{OffsetDateTime, UtcOffset};

pub const PROGRESS_RADIUS: f64 = 75.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub priority_label: &'static str,
    pub date_label: String,
    pub check_label: &'static str,
    pub removing: bool,
}

impl TaskView {
    pub fn from_task(task: &Task, offset: UtcOffset, removing: bool) -> Self {
        Self {
            id: task.id.clone(),
            text: task.text.clone(),
            completed: task.completed,
            priority: task.priority,
            priority_label: task.priority.label(),
            date_label: short_date(task.created_at, offset),
            check_label: if task.completed {
                "Mark incomplete"
            } else {
                "Mark complete"
            },
            removing,
        }
    }

    /// List item markup. Task text and id are always escaped.
    pub fn to_html(&self) -> String {
        let mut classes = String::from("task-item");
        if self.completed {
            classes.push_str(" completed");
        }
        if self.removing {
            classes.push_str(" slide-out");
        }

        format!(
            concat!(
                "<li class=\"{classes}\" data-id=\"{id}\">",
                "<button class=\"task-check\" aria-label=\"{check}\"></button>",
                "<div class=\"task-content\">",
                "<p class=\"task-text\">{text}</p>",
                "<div class=\"task-meta\">",
                "<span class=\"priority-badge priority-{priority}\">{badge}</span>",
                "<span class=\"task-date\">{date}</span>",
                "</div></div>",
                "<button class=\"task-delete\" aria-label=\"Delete task\"></button>",
                "</li>"
            ),
            classes = classes,
            id = escape_html(&self.id),
            check = self.check_label,
            text = escape_html(&self.text),
            priority = self.priority.as_str(),
            badge = self.priority_label,
            date = self.date_label,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListView {
    pub items: Vec<TaskView>,
    pub empty_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsView {
    pub total: usize,
    pub done: usize,
    pub pending: usize,
    pub percent: u32,
    pub circumference: f64,
    pub dash_offset: f64,
}

pub fn render_list(
    tasks: &[Task],
    criteria: &FilterCriteria,
    removing: &BTreeSet<String>,
    offset: UtcOffset,
) -> ListView {
    let items: Vec<TaskView> = filter_tasks(tasks, criteria)
        .into_iter()
        .map(|task| TaskView::from_task(task, offset, removing.contains(&task.id)))
        .collect();
    let empty_visible = items.is_empty();

    ListView {
        items,
        empty_visible,
    }
}

pub fn summarize(tasks: &[Task]) -> StatsView {
    let total = tasks.len();
    let done = tasks.iter().filter(|task| task.completed).count();
    let percent = completion_percent(done, total);
    let circumference = 2.0 * PI * PROGRESS_RADIUS;

    StatsView {
        total,
        done,
        pending: total - done,
        percent,
        circumference,
        dash_offset: circumference * (1.0 - f64::from(percent) / 100.0),
    }
}

pub fn completion_percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (done as f64 / total as f64 * 100.0).round() as u32
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// `"Oct 17"` style date in the given offset.
pub fn short_date(at: OffsetDateTime, offset: UtcOffset) -> String {
    let date = at.to_offset(offset).date();
    let month = date.month().to_string();
    format!("{} {}", &month[..3], date.day())
}
