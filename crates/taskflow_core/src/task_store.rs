use crate::error::AppError;
use crate::model::{Priority, Task, generate_id};
use crate::storage::{KeyValueStore, Persistence};
use time::OffsetDateTime;

/// Owns the ordered task collection (newest first) and writes it through to
/// persistence after every mutation.
#[derive(Debug)]
pub struct TaskStore<S> {
    tasks: Vec<Task>,
    persistence: Persistence<S>,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn open(mut persistence: Persistence<S>) -> Result<Self, AppError> {
        let tasks = persistence.load()?;
        Ok(Self { tasks, persistence })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    pub fn persistence_mut(&mut self) -> &mut Persistence<S> {
        &mut self.persistence
    }

    pub fn add(&mut self, text: &str, priority: Priority) -> Result<Task, AppError> {
        self.add_at(text, priority, OffsetDateTime::now_utc())
    }

    pub fn add_at(
        &mut self,
        text: &str,
        priority: Priority,
        now: OffsetDateTime,
    ) -> Result<Task, AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("text is required"));
        }

        let task = Task::new(generate_id(now), trimmed.to_string(), priority, now);
        let mut next = Vec::with_capacity(self.tasks.len() + 1);
        next.push(task.clone());
        next.extend(self.tasks.iter().cloned());
        self.commit(next)?;
        tracing::debug!(id = %task.id, priority = %priority, "added task");

        Ok(task)
    }

    pub fn toggle(&mut self, id: &str) -> Result<Option<Task>, AppError> {
        self.toggle_at(id, OffsetDateTime::now_utc())
    }

    pub fn toggle_at(&mut self, id: &str, now: OffsetDateTime) -> Result<Option<Task>, AppError> {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            tracing::debug!(id, "toggle ignored, no such task");
            return Ok(None);
        };

        let mut next = self.tasks.clone();
        next[index].toggle(now);
        let updated = next[index].clone();
        self.commit(next)?;

        Ok(Some(updated))
    }

    pub fn delete(&mut self, id: &str) -> Result<Option<Task>, AppError> {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            tracing::debug!(id, "delete ignored, no such task");
            return Ok(None);
        };

        let mut next = self.tasks.clone();
        let removed = next.remove(index);
        self.commit(next)?;

        Ok(Some(removed))
    }

    /// Removes every completed task and returns them in their original order.
    pub fn clear_completed(&mut self) -> Result<Vec<Task>, AppError> {
        if !self.tasks.iter().any(|task| task.completed) {
            return Ok(Vec::new());
        }

        let (removed, kept): (Vec<Task>, Vec<Task>) =
            self.tasks.iter().cloned().partition(|task| task.completed);
        self.commit(kept)?;
        tracing::debug!(count = removed.len(), "cleared completed tasks");

        Ok(removed)
    }

    /// Persists `next` and only then makes it the live collection, so a failed
    /// write leaves memory matching the last saved snapshot.
    fn commit(&mut self, next: Vec<Task>) -> Result<(), AppError> {
        self.persistence.save(&next)?;
        self.tasks = next;
        Ok(())
    }
}
