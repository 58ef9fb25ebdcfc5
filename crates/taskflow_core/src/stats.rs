use crate::model::Task;
use serde::Serialize;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

pub const WEEK_DAYS: i64 = 7;
pub const COMPLETED_LABEL: &str = "Completed";
pub const PENDING_LABEL: &str = "Pending";
pub const PLACEHOLDER_LABEL: &str = "No tasks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    pub date: Date,
    pub label: String,
    pub count: usize,
}

/// Where calendar days start on the timeline.
#[derive(Debug, Clone, Copy, Default)]
pub enum DayBoundaries {
    /// Midnight in the offset of `now` for every day.
    #[default]
    Fixed,
    /// Midnight in the offset the resolver reports for each date, so days
    /// around a DST change get their true length. `None` falls back to `now`'s
    /// offset.
    PerDate(fn(Date) -> Option<UtcOffset>),
}

impl DayBoundaries {
    pub fn day_start(self, date: Date, fallback: UtcOffset) -> OffsetDateTime {
        let offset = match self {
            Self::Fixed => fallback,
            Self::PerDate(resolve) => resolve(date).unwrap_or(fallback),
        };
        date.midnight().assume_offset(offset)
    }
}

/// Completions per calendar day for the week ending on `now`'s date, oldest
/// first. Day boundaries are midnight in `now`'s offset.
pub fn weekly_completions(tasks: &[Task], now: OffsetDateTime) -> Vec<DayBucket> {
    weekly_completions_with(tasks, now, DayBoundaries::Fixed)
}

/// Same as [`weekly_completions`] with explicit day boundaries. Each bucket is
/// `[start of day, start of next day)`.
pub fn weekly_completions_with(
    tasks: &[Task],
    now: OffsetDateTime,
    boundaries: DayBoundaries,
) -> Vec<DayBucket> {
    let today = now.date();
    let fallback = now.offset();
    (0..WEEK_DAYS)
        .rev()
        .map(|days_ago| {
            let date = today.saturating_sub(Duration::days(days_ago));
            let start = boundaries.day_start(date, fallback);
            let end = date.next_day().map_or(start + Duration::days(1), |next| {
                boundaries.day_start(next, fallback)
            });
            let count = tasks
                .iter()
                .filter_map(|task| task.completed_at)
                .filter(|completed_at| *completed_at >= start && *completed_at < end)
                .count();

            DayBucket {
                date,
                label: weekday_label(date),
                count,
            }
        })
        .collect()
}

fn weekday_label(date: Date) -> String {
    date.weekday().to_string()[..3].to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDistribution {
    pub done: usize,
    pub pending: usize,
}

impl StatusDistribution {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let done = tasks.iter().filter(|task| task.completed).count();
        Self {
            done,
            pending: tasks.len() - done,
        }
    }

    pub fn has_data(&self) -> bool {
        self.done > 0 || self.pending > 0
    }

    /// Chart categories; a single placeholder slice when there is nothing to show.
    pub fn slices(&self) -> Vec<(&'static str, usize)> {
        if self.has_data() {
            vec![(COMPLETED_LABEL, self.done), (PENDING_LABEL, self.pending)]
        } else {
            vec![(PLACEHOLDER_LABEL, 1)]
        }
    }
}

pub fn status_distribution(tasks: &[Task]) -> StatusDistribution {
    StatusDistribution::from_tasks(tasks)
}

pub fn weekly_tooltip(count: usize) -> String {
    if count == 1 {
        "1 task completed".to_string()
    } else {
        format!("{count} tasks completed")
    }
}

pub fn status_tooltip(distribution: &StatusDistribution, label: &str, value: usize) -> String {
    if !distribution.has_data() {
        return "Add tasks to see distribution".to_string();
    }
    let total = distribution.done + distribution.pending;
    let percent = crate::render::completion_percent(value, total);
    format!(" {label}: {value} ({percent}%)")
}
