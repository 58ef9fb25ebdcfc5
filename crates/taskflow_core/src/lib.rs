pub mod app;
pub mod chart;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod offline;
pub mod render;
pub mod stats;
pub mod storage;
pub mod task_store;
pub mod theme;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{Priority, Task};
    use time::macros::datetime;

    #[test]
    fn task_has_required_fields() {
        let task = Task::new(
            "task-1".to_string(),
            "demo".to_string(),
            Priority::default(),
            datetime!(2026-10-17 00:00 UTC),
        );

        assert_eq!(task.id, "task-1");
        assert_eq!(task.text, "demo");
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.created_at, datetime!(2026-10-17 00:00 UTC));
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing text");
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.to_string(), "invalid_input - missing text");
    }
}
