use crate::error::AppError;
use crate::model::{Priority, Task, generate_id};
use crate::storage::KeyValueStore;
use crate::theme::Theme;
use time::OffsetDateTime;

pub const TASKS_KEY: &str = "taskflow_todos";
pub const THEME_KEY: &str = "taskflow_theme";
pub const LEGACY_KEY: &str = "todos";

/// Mirrors the task collection and the theme preference into a key-value store.
#[derive(Debug)]
pub struct Persistence<S> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn load(&mut self) -> Result<Vec<Task>, AppError> {
        self.load_at(OffsetDateTime::now_utc())
    }

    #[tracing::instrument(skip(self))]
    pub fn load_at(&mut self, now: OffsetDateTime) -> Result<Vec<Task>, AppError> {
        if let Some(data) = self.store.get(TASKS_KEY)? {
            let tasks: Vec<Task> = serde_json::from_str(&data)
                .map_err(|err| AppError::corrupt_entry(TASKS_KEY, err))?;
            tracing::debug!(count = tasks.len(), "loaded tasks");
            return Ok(tasks);
        }

        match self.store.get(LEGACY_KEY)? {
            Some(legacy) if !legacy.is_empty() => self.migrate_legacy(&legacy, now),
            _ => Ok(Vec::new()),
        }
    }

    fn migrate_legacy(&mut self, legacy: &str, now: OffsetDateTime) -> Result<Vec<Task>, AppError> {
        let items = match parse_legacy(legacy) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(error = %err, "failed to migrate legacy todos");
                return Ok(Vec::new());
            }
        };

        let migrated: Vec<Task> = items
            .into_iter()
            .map(|text| Task::new(generate_id(now), text, Priority::Medium, now))
            .collect();

        self.save(&migrated)?;
        self.store.remove(LEGACY_KEY)?;
        tracing::info!(count = migrated.len(), "migrated legacy todos");

        Ok(migrated)
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save(&mut self, tasks: &[Task]) -> Result<(), AppError> {
        let content =
            serde_json::to_string(tasks).map_err(|err| AppError::invalid_data(err.to_string()))?;
        self.store.set(TASKS_KEY, &content)
    }

    pub fn load_theme(&self) -> Result<Option<Theme>, AppError> {
        let Some(raw) = self.store.get(THEME_KEY)? else {
            return Ok(None);
        };

        match raw.parse::<Theme>() {
            Ok(theme) => Ok(Some(theme)),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring stored theme");
                Ok(None)
            }
        }
    }

    pub fn save_theme(&mut self, theme: Theme) -> Result<(), AppError> {
        self.store.set(THEME_KEY, theme.as_str())
    }
}

fn parse_legacy(legacy: &str) -> Result<Vec<String>, AppError> {
    let items: Vec<serde_json::Value> =
        serde_json::from_str(legacy).map_err(|err| AppError::corrupt_entry(LEGACY_KEY, err))?;

    Ok(items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        })
        .collect())
}
