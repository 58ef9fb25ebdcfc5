//! Application shell: wires the task store, filters, theme and charts together
//! and produces the view-model after every change.

use crate::chart::{ChartAdapter, ChartBackend};
use crate::error::AppError;
use crate::filter::{FilterCriteria, PriorityFilter, StatusFilter};
use crate::model::{Priority, Task};
use crate::render::{ListView, StatsView, render_list, summarize};
use crate::stats::DayBoundaries;
use crate::storage::{KeyValueStore, Persistence};
use crate::task_store::TaskStore;
use crate::theme::{Theme, ThemeController};
use serde::Serialize;
use std::collections::BTreeSet;
use time::{OffsetDateTime, UtcOffset};

/// Transient rejection cue for a blank submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShakeCue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Added(Task),
    Rejected(ShakeCue),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppView {
    pub list: ListView,
    pub stats: StatsView,
    pub theme: Theme,
}

pub struct App<S> {
    store: TaskStore<S>,
    criteria: FilterCriteria,
    theme: ThemeController,
    charts: ChartAdapter,
    removing: BTreeSet<String>,
    clearing: Vec<String>,
    offset: UtcOffset,
}

impl<S: KeyValueStore> App<S> {
    /// Loads the theme and tasks, then builds the charts. `now` carries the
    /// local offset used for day boundaries and dates.
    pub fn start(
        persistence: Persistence<S>,
        default_theme: Theme,
        backend: Option<Box<dyn ChartBackend>>,
        now: OffsetDateTime,
    ) -> Result<Self, AppError> {
        Self::start_with_day_boundaries(
            persistence,
            default_theme,
            backend,
            DayBoundaries::Fixed,
            now,
        )
    }

    pub fn start_with_day_boundaries(
        persistence: Persistence<S>,
        default_theme: Theme,
        backend: Option<Box<dyn ChartBackend>>,
        boundaries: DayBoundaries,
        now: OffsetDateTime,
    ) -> Result<Self, AppError> {
        let theme = persistence.load_theme()?.unwrap_or(default_theme);
        let store = TaskStore::open(persistence)?;
        let controller = ThemeController::new(theme);
        let mut charts = ChartAdapter::new(backend).with_day_boundaries(boundaries);
        charts.init(store.tasks(), now, controller.colors());
        tracing::info!(tasks = store.tasks().len(), theme = %theme, "app started");

        Ok(Self {
            store,
            criteria: FilterCriteria::default(),
            theme: controller,
            charts,
            removing: BTreeSet::new(),
            clearing: Vec::new(),
            offset: now.offset(),
        })
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    pub fn charts(&self) -> &ChartAdapter {
        &self.charts
    }

    pub fn theme(&self) -> Theme {
        self.theme.current()
    }

    pub fn day_boundaries(&self) -> DayBoundaries {
        self.charts.day_boundaries()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn is_removing(&self, id: &str) -> bool {
        self.removing.contains(id)
    }

    pub fn submit_task(
        &mut self,
        text: &str,
        priority: Priority,
        now: OffsetDateTime,
    ) -> Result<SubmitOutcome, AppError> {
        if text.trim().is_empty() {
            return Ok(SubmitOutcome::Rejected(ShakeCue));
        }

        let task = self.store.add_at(text, priority, now)?;
        self.refresh(now);
        Ok(SubmitOutcome::Added(task))
    }

    pub fn toggle_task(&mut self, id: &str, now: OffsetDateTime) -> Result<Option<Task>, AppError> {
        let toggled = self.store.toggle_at(id, now)?;
        if toggled.is_some() {
            self.refresh(now);
        }
        Ok(toggled)
    }

    /// Starts the exit phase of a deletion. The task stays in the store until
    /// [`App::finish_removal`] is signalled.
    pub fn request_delete(&mut self, id: &str) -> bool {
        if self.store.get(id).is_none() {
            return false;
        }
        self.removing.insert(id.to_string())
    }

    /// Exit animation finished: drop the task from the store.
    pub fn finish_removal(
        &mut self,
        id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Task>, AppError> {
        if !self.removing.remove(id) {
            return Ok(None);
        }

        let removed = self.store.delete(id)?;
        self.refresh(now);
        Ok(removed)
    }

    /// Marks every completed task as leaving and returns their ids.
    pub fn request_clear_completed(&mut self) -> Vec<String> {
        let ids: Vec<String> = self
            .store
            .tasks()
            .iter()
            .filter(|task| task.completed)
            .map(|task| task.id.clone())
            .collect();
        self.removing.extend(ids.iter().cloned());
        self.clearing.extend(ids.iter().cloned());
        ids
    }

    /// Removes whatever is completed now and drops every mark set by
    /// [`App::request_clear_completed`], including tasks reopened meanwhile.
    pub fn finish_clear_completed(&mut self, now: OffsetDateTime) -> Result<Vec<Task>, AppError> {
        let result = self.store.clear_completed();
        for id in self.clearing.drain(..) {
            self.removing.remove(&id);
        }
        let removed = result?;
        for task in &removed {
            self.removing.remove(&task.id);
        }
        if !removed.is_empty() {
            self.refresh(now);
        }
        Ok(removed)
    }

    pub fn set_search(&mut self, search: &str) {
        self.criteria.search = search.to_string();
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.criteria.status = status;
    }

    pub fn set_priority_filter(&mut self, priority: PriorityFilter) {
        self.criteria.priority = priority;
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, AppError> {
        let next = self.theme.current().toggled();
        self.store.persistence_mut().save_theme(next)?;
        self.theme.toggle();
        self.charts.apply_theme(self.store.tasks(), self.theme.colors());
        tracing::debug!(theme = %next, "theme toggled");
        Ok(next)
    }

    pub fn view(&self) -> AppView {
        AppView {
            list: render_list(self.store.tasks(), &self.criteria, &self.removing, self.offset),
            stats: summarize(self.store.tasks()),
            theme: self.theme.current(),
        }
    }

    fn refresh(&mut self, now: OffsetDateTime) {
        self.charts
            .update_data(self.store.tasks(), now.to_offset(self.offset), self.theme.colors());
    }
}
