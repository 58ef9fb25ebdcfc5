use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_SUFFIX_LEN: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl Task {
    pub fn new(id: String, text: String, priority: Priority, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            text,
            completed: false,
            priority,
            created_at: created_at.to_offset(UtcOffset::UTC),
            completed_at: None,
        }
    }

    /// Flips completion, keeping `completed_at` set exactly while completed.
    /// Timestamps are stored in UTC.
    pub fn toggle(&mut self, now: OffsetDateTime) {
        self.completed = !self.completed;
        self.completed_at = self.completed.then(|| now.to_offset(UtcOffset::UTC));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

/// Builds a task id from the creation time in base 36 plus random base-36 digits.
pub fn generate_id(now: OffsetDateTime) -> String {
    let millis = u128::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0);
    let random = to_base36(Uuid::new_v4().as_u128());
    let suffix = &random[random.len().saturating_sub(RANDOM_SUFFIX_LEN)..];
    format!("{}{suffix:0>width$}", to_base36(millis), width = RANDOM_SUFFIX_LEN)
}

fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::{Priority, Task, generate_id, to_base36};
    use std::collections::HashSet;
    use time::macros::datetime;

    #[test]
    fn toggle_keeps_completed_at_in_step() {
        let created = datetime!(2026-10-10 09:00 UTC);
        let mut task = Task::new("t1".into(), "demo".into(), Priority::Low, created);

        task.toggle(datetime!(2026-10-11 10:00 UTC));
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(datetime!(2026-10-11 10:00 UTC)));

        task.toggle(datetime!(2026-10-12 10:00 UTC));
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn serializes_with_camel_case_keys_and_null_completion() {
        let task = Task::new(
            "t1".into(),
            "demo".into(),
            Priority::High,
            datetime!(2026-10-10 09:00 UTC),
        );
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["createdAt"], "2026-10-10T09:00:00Z");
        assert!(value["completedAt"].is_null());
        assert_eq!(value["priority"], "high");
        assert_eq!(value["completed"], false);
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        let mut task = Task::new(
            "t1".into(),
            "demo".into(),
            Priority::Low,
            datetime!(2026-10-17 09:00 +02:00),
        );
        task.toggle(datetime!(2026-10-17 10:00 +02:00));
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["createdAt"], "2026-10-17T07:00:00Z");
        assert_eq!(value["completedAt"], "2026-10-17T08:00:00Z");
    }

    #[test]
    fn parses_millisecond_timestamps() {
        let raw = r#"{"id":"x","text":"a","completed":true,"priority":"low","createdAt":"2026-10-10T09:00:00.123Z","completedAt":"2026-10-11T09:00:00.000Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();

        assert!(task.completed);
        assert_eq!(task.completed_at, Some(datetime!(2026-10-11 09:00 UTC)));
        assert_eq!(task.created_at.millisecond(), 123);
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn base36_matches_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn generated_ids_are_unique_within_one_instant() {
        let now = datetime!(2026-10-17 12:00 UTC);
        let ids: HashSet<String> = (0..500).map(|_| generate_id(now)).collect();

        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.starts_with(&to_base36(1_792_238_400_000))));
    }
}
