//! Data shaping and options for the two statistics charts.
//!
//! Drawing is left to a [`ChartBackend`]; configs serialize to the JSON shape
//! Chart.js accepts.

use crate::error::AppError;
use crate::model::Task;
use crate::stats::{DayBoundaries, StatusDistribution, weekly_completions_with};
use crate::theme::ChartColors;
use serde::Serialize;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;

pub const WEEKLY_SURFACE: &str = "weekly-chart";
pub const STATUS_SURFACE: &str = "status-chart";

const FONT_FAMILY: &str = "Inter";
const COMPLETED_COLOR: &str = "#10b981";
const PENDING_COLOR: &str = "#f59e0b";
const DATA_SPACING: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Doughnut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<usize>,
    #[serde(flatten)]
    pub style: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Swap data in place without animation.
    Silent,
    /// Full redraw, used after option changes.
    Redraw,
}

/// Rendering backend the charts are handed to.
pub trait ChartBackend {
    fn create(&mut self, surface: &str, config: &ChartConfig) -> Result<ChartId, AppError>;

    fn update(
        &mut self,
        chart: ChartId,
        config: &ChartConfig,
        mode: UpdateMode,
    ) -> Result<(), AppError>;
}

fn tooltip_options(display_colors: bool) -> Value {
    json!({
        "backgroundColor": "rgba(15, 23, 42, 0.9)",
        "titleFont": { "family": FONT_FAMILY, "size": 12 },
        "bodyFont": { "family": FONT_FAMILY, "size": 12 },
        "padding": 10,
        "cornerRadius": 8,
        "displayColors": display_colors,
    })
}

pub fn weekly_chart_config(tasks: &[Task], now: OffsetDateTime, colors: ChartColors) -> ChartConfig {
    build_weekly_config(tasks, now, colors, DayBoundaries::Fixed)
}

fn build_weekly_config(
    tasks: &[Task],
    now: OffsetDateTime,
    colors: ChartColors,
    boundaries: DayBoundaries,
) -> ChartConfig {
    let mut style = Map::new();
    style.insert("backgroundColor".into(), json!("rgba(99, 102, 241, 0.75)"));
    style.insert("borderColor".into(), json!("rgba(99, 102, 241, 1)"));
    style.insert("borderWidth".into(), json!(2));
    style.insert("borderRadius".into(), json!(8));
    style.insert("borderSkipped".into(), json!(false));
    style.insert("maxBarThickness".into(), json!(32));

    let mut config = ChartConfig {
        kind: ChartKind::Bar,
        data: ChartData {
            labels: Vec::new(),
            datasets: vec![Dataset {
                label: Some("Completed".into()),
                data: Vec::new(),
                style,
            }],
        },
        options: json!({
            "responsive": true,
            "maintainAspectRatio": false,
            "plugins": {
                "legend": { "display": false },
                "tooltip": tooltip_options(false),
            },
            "scales": {
                "x": {
                    "grid": { "display": false },
                    "ticks": {
                        "color": colors.text,
                        "font": { "family": FONT_FAMILY, "size": 11, "weight": 500 },
                    },
                    "border": { "display": false },
                },
                "y": {
                    "beginAtZero": true,
                    "grid": { "color": colors.grid },
                    "ticks": {
                        "color": colors.text,
                        "font": { "family": FONT_FAMILY, "size": 11 },
                        "stepSize": 1,
                        "padding": 8,
                    },
                    "border": { "display": false },
                },
            },
        }),
    };
    fill_weekly_data(&mut config, tasks, now, boundaries);
    config
}

pub fn status_chart_config(tasks: &[Task], colors: ChartColors) -> ChartConfig {
    let mut style = Map::new();
    style.insert("borderWidth".into(), json!(0));
    style.insert("cutout".into(), json!("72%"));

    let mut config = ChartConfig {
        kind: ChartKind::Doughnut,
        data: ChartData {
            labels: Vec::new(),
            datasets: vec![Dataset {
                label: None,
                data: Vec::new(),
                style,
            }],
        },
        options: json!({
            "responsive": true,
            "maintainAspectRatio": false,
            "plugins": {
                "legend": {
                    "position": "bottom",
                    "labels": {
                        "color": colors.text,
                        "font": { "family": FONT_FAMILY, "size": 12, "weight": 500 },
                        "padding": 20,
                        "usePointStyle": true,
                        "pointStyleWidth": 10,
                    },
                },
                "tooltip": tooltip_options(true),
            },
        }),
    };
    fill_status_data(&mut config, tasks, colors);
    config
}

fn fill_weekly_data(
    config: &mut ChartConfig,
    tasks: &[Task],
    now: OffsetDateTime,
    boundaries: DayBoundaries,
) {
    let buckets = weekly_completions_with(tasks, now, boundaries);
    config.data.labels = buckets.iter().map(|bucket| bucket.label.clone()).collect();
    if let Some(dataset) = config.data.datasets.first_mut() {
        dataset.data = buckets.iter().map(|bucket| bucket.count).collect();
    }
}

fn fill_status_data(config: &mut ChartConfig, tasks: &[Task], colors: ChartColors) {
    let distribution = StatusDistribution::from_tasks(tasks);
    let slices = distribution.slices();
    config.data.labels = slices.iter().map(|(label, _)| label.to_string()).collect();

    let Some(dataset) = config.data.datasets.first_mut() else {
        return;
    };
    dataset.data = slices.iter().map(|(_, value)| *value).collect();
    let (background, spacing) = if distribution.has_data() {
        (json!([COMPLETED_COLOR, PENDING_COLOR]), DATA_SPACING)
    } else {
        (json!([colors.grid]), 0)
    };
    dataset.style.insert("backgroundColor".into(), background);
    dataset.style.insert("spacing".into(), json!(spacing));
}

fn set_option(options: &mut Value, pointer: &str, value: &str) {
    if let Some(slot) = options.pointer_mut(pointer) {
        *slot = json!(value);
    }
}

#[derive(Debug)]
struct LiveChart {
    id: ChartId,
    config: ChartConfig,
}

#[derive(Debug)]
struct LiveCharts {
    weekly: LiveChart,
    status: LiveChart,
}

/// Owns the live chart configs and pushes changes to the backend.
pub struct ChartAdapter {
    backend: Option<Box<dyn ChartBackend>>,
    charts: Option<LiveCharts>,
    boundaries: DayBoundaries,
}

impl ChartAdapter {
    pub fn new(backend: Option<Box<dyn ChartBackend>>) -> Self {
        Self {
            backend,
            charts: None,
            boundaries: DayBoundaries::Fixed,
        }
    }

    /// Day boundaries used for the weekly histogram.
    pub fn with_day_boundaries(mut self, boundaries: DayBoundaries) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn day_boundaries(&self) -> DayBoundaries {
        self.boundaries
    }

    pub fn is_live(&self) -> bool {
        self.charts.is_some()
    }

    pub fn weekly_config(&self) -> Option<&ChartConfig> {
        self.charts.as_ref().map(|charts| &charts.weekly.config)
    }

    pub fn status_config(&self) -> Option<&ChartConfig> {
        self.charts.as_ref().map(|charts| &charts.status.config)
    }

    /// Builds both charts. Failures leave the adapter without charts.
    pub fn init(&mut self, tasks: &[Task], now: OffsetDateTime, colors: ChartColors) {
        let Some(backend) = self.backend.as_mut() else {
            tracing::warn!("no chart backend available, skipping charts");
            return;
        };

        let weekly = build_weekly_config(tasks, now, colors, self.boundaries);
        let status = status_chart_config(tasks, colors);
        let created = backend.create(WEEKLY_SURFACE, &weekly).and_then(|weekly_id| {
            backend
                .create(STATUS_SURFACE, &status)
                .map(|status_id| (weekly_id, status_id))
        });

        match created {
            Ok((weekly_id, status_id)) => {
                self.charts = Some(LiveCharts {
                    weekly: LiveChart {
                        id: weekly_id,
                        config: weekly,
                    },
                    status: LiveChart {
                        id: status_id,
                        config: status,
                    },
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, "charts could not be initialized");
                self.charts = None;
            }
        }
    }

    /// Refreshes chart data in place without rebuilding the charts.
    pub fn update_data(&mut self, tasks: &[Task], now: OffsetDateTime, colors: ChartColors) {
        let (Some(backend), Some(charts)) = (self.backend.as_mut(), self.charts.as_mut()) else {
            return;
        };

        fill_weekly_data(&mut charts.weekly.config, tasks, now, self.boundaries);
        fill_status_data(&mut charts.status.config, tasks, colors);
        push(&mut **backend, &charts.weekly, UpdateMode::Silent);
        push(&mut **backend, &charts.status, UpdateMode::Silent);
    }

    /// Re-colors the live charts for a theme change and redraws them.
    pub fn apply_theme(&mut self, tasks: &[Task], colors: ChartColors) {
        let (Some(backend), Some(charts)) = (self.backend.as_mut(), self.charts.as_mut()) else {
            return;
        };

        let weekly = &mut charts.weekly.config.options;
        set_option(weekly, "/scales/x/ticks/color", colors.text);
        set_option(weekly, "/scales/y/ticks/color", colors.text);
        set_option(weekly, "/scales/y/grid/color", colors.grid);
        push(&mut **backend, &charts.weekly, UpdateMode::Redraw);

        set_option(
            &mut charts.status.config.options,
            "/plugins/legend/labels/color",
            colors.text,
        );
        if !StatusDistribution::from_tasks(tasks).has_data()
            && let Some(dataset) = charts.status.config.data.datasets.first_mut()
        {
            dataset
                .style
                .insert("backgroundColor".into(), json!([colors.grid]));
        }
        push(&mut **backend, &charts.status, UpdateMode::Redraw);
    }
}

fn push(backend: &mut dyn ChartBackend, chart: &LiveChart, mode: UpdateMode) {
    if let Err(err) = backend.update(chart.id, &chart.config, mode) {
        tracing::warn!(error = %err, chart = chart.id.0, "chart update failed");
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ChartAdapter, ChartBackend, ChartConfig, ChartId, ChartKind, STATUS_SURFACE,
        UpdateMode, WEEKLY_SURFACE, status_chart_config, weekly_chart_config,
    };
    use crate::error::AppError;
    use crate::model::{Priority, Task};
    use crate::stats::DayBoundaries;
    use crate::theme::{ChartColors, Theme};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use time::macros::datetime;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Create(String),
        Update(ChartId, UpdateMode),
    }

    #[derive(Default)]
    struct RecordingBackend {
        events: Rc<RefCell<Vec<Event>>>,
        last: Rc<RefCell<Vec<ChartConfig>>>,
        fail_on: Option<&'static str>,
    }

    impl ChartBackend for RecordingBackend {
        fn create(&mut self, surface: &str, config: &ChartConfig) -> Result<ChartId, AppError> {
            if self.fail_on == Some(surface) {
                return Err(AppError::io("canvas unavailable"));
            }
            let mut last = self.last.borrow_mut();
            last.push(config.clone());
            self.events
                .borrow_mut()
                .push(Event::Create(surface.to_string()));
            Ok(ChartId(last.len() - 1))
        }

        fn update(
            &mut self,
            chart: ChartId,
            config: &ChartConfig,
            mode: UpdateMode,
        ) -> Result<(), AppError> {
            self.last.borrow_mut()[chart.0] = config.clone();
            self.events.borrow_mut().push(Event::Update(chart, mode));
            Ok(())
        }
    }

    fn completed_task(text: &str) -> Task {
        let mut task = Task::new(
            text.into(),
            text.into(),
            Priority::Medium,
            datetime!(2026-10-15 09:00 UTC),
        );
        task.toggle(datetime!(2026-10-17 09:00 UTC));
        task
    }

    fn light() -> ChartColors {
        ChartColors::for_theme(Theme::Light)
    }

    #[test]
    fn weekly_config_serializes_like_chart_js() {
        let now = datetime!(2026-10-17 12:00 UTC);
        let config = weekly_chart_config(&[completed_task("a")], now, light());
        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value["type"], "bar");
        assert_eq!(value["data"]["labels"].as_array().unwrap().len(), 7);
        assert_eq!(value["data"]["datasets"][0]["label"], "Completed");
        assert_eq!(value["data"]["datasets"][0]["data"][6], 1);
        assert_eq!(value["data"]["datasets"][0]["maxBarThickness"], 32);
        assert_eq!(value["options"]["scales"]["y"]["grid"]["color"], light().grid);
        assert_eq!(value["options"]["plugins"]["legend"]["display"], false);
    }

    #[test]
    fn status_config_uses_placeholder_without_tasks() {
        let config = status_chart_config(&[], light());
        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(config.kind, ChartKind::Doughnut);
        assert_eq!(value["data"]["labels"], json!(["No tasks"]));
        assert_eq!(value["data"]["datasets"][0]["data"], json!([1]));
        assert_eq!(
            value["data"]["datasets"][0]["backgroundColor"],
            json!([light().grid])
        );
        assert_eq!(value["data"]["datasets"][0]["spacing"], 0);
        assert!(value["data"]["datasets"][0].get("label").is_none());
    }

    #[test]
    fn status_config_splits_completed_and_pending() {
        let pending = Task::new(
            "p".into(),
            "p".into(),
            Priority::Low,
            datetime!(2026-10-15 09:00 UTC),
        );
        let config = status_chart_config(&[completed_task("a"), pending], light());

        assert_eq!(config.data.labels, vec!["Completed", "Pending"]);
        assert_eq!(config.data.datasets[0].data, vec![1, 1]);
        assert_eq!(config.data.datasets[0].style["spacing"], 3);
    }

    #[test]
    fn missing_backend_skips_charts() {
        let mut adapter = ChartAdapter::new(None);
        adapter.init(&[], datetime!(2026-10-17 12:00 UTC), light());
        adapter.update_data(&[], datetime!(2026-10-17 12:00 UTC), light());

        assert!(!adapter.is_live());
        assert!(adapter.weekly_config().is_none());
    }

    #[test]
    fn failing_backend_leaves_adapter_chartless() {
        let backend = RecordingBackend {
            fail_on: Some(STATUS_SURFACE),
            ..RecordingBackend::default()
        };
        let mut adapter = ChartAdapter::new(Some(Box::new(backend)));

        adapter.init(&[], datetime!(2026-10-17 12:00 UTC), light());

        assert!(!adapter.is_live());
    }

    #[test]
    fn update_data_is_silent_and_in_place() {
        let backend = RecordingBackend::default();
        let events = Rc::clone(&backend.events);
        let last = Rc::clone(&backend.last);
        let now = datetime!(2026-10-17 12:00 UTC);
        let mut adapter = ChartAdapter::new(Some(Box::new(backend)));

        adapter.init(&[], now, light());
        adapter.update_data(&[completed_task("a")], now, light());

        assert_eq!(
            *events.borrow(),
            vec![
                Event::Create(WEEKLY_SURFACE.into()),
                Event::Create(STATUS_SURFACE.into()),
                Event::Update(ChartId(0), UpdateMode::Silent),
                Event::Update(ChartId(1), UpdateMode::Silent),
            ]
        );
        assert_eq!(last.borrow()[0].data.datasets[0].data[6], 1);
        assert_eq!(last.borrow()[1].data.labels, vec!["Completed", "Pending"]);
    }

    #[test]
    fn apply_theme_recolors_without_rebuilding() {
        let backend = RecordingBackend::default();
        let events = Rc::clone(&backend.events);
        let now = datetime!(2026-10-17 12:00 UTC);
        let dark = ChartColors::for_theme(Theme::Dark);
        let mut adapter = ChartAdapter::new(Some(Box::new(backend)));

        adapter.init(&[], now, light());
        adapter.apply_theme(&[], dark);

        let weekly = serde_json::to_value(adapter.weekly_config().unwrap()).unwrap();
        assert_eq!(weekly["options"]["scales"]["x"]["ticks"]["color"], dark.text);
        assert_eq!(weekly["options"]["scales"]["y"]["ticks"]["color"], dark.text);
        assert_eq!(weekly["options"]["scales"]["y"]["grid"]["color"], dark.grid);

        let status = serde_json::to_value(adapter.status_config().unwrap()).unwrap();
        assert_eq!(
            status["options"]["plugins"]["legend"]["labels"]["color"],
            dark.text
        );
        assert_eq!(
            status["data"]["datasets"][0]["backgroundColor"],
            json!([dark.grid])
        );

        let creates = events
            .borrow()
            .iter()
            .filter(|event| matches!(event, Event::Create(_)))
            .count();
        assert_eq!(creates, 2);
        assert!(events
            .borrow()
            .ends_with(&[
                Event::Update(ChartId(0), UpdateMode::Redraw),
                Event::Update(ChartId(1), UpdateMode::Redraw),
            ]));
    }

    #[test]
    fn adapter_buckets_with_its_day_boundaries() {
        let backend = RecordingBackend::default();
        let last = Rc::clone(&backend.last);
        let now = datetime!(2026-10-27 12:00 +01:00);
        let mut task = Task::new(
            "t".into(),
            "t".into(),
            Priority::Low,
            datetime!(2026-10-20 09:00 UTC),
        );
        task.toggle(datetime!(2026-10-24 22:30 UTC));
        let summer_until_25th = DayBoundaries::PerDate(|date| {
            Some(if date <= time::macros::date!(2026 - 10 - 25) {
                time::macros::offset!(+2)
            } else {
                time::macros::offset!(+1)
            })
        });
        let mut adapter =
            ChartAdapter::new(Some(Box::new(backend))).with_day_boundaries(summer_until_25th);

        adapter.init(&[task.clone()], now, light());

        assert_eq!(last.borrow()[0].data.datasets[0].data, vec![0, 0, 0, 0, 1, 0, 0]);
        let fixed = weekly_chart_config(&[task], now, light());
        assert_eq!(fixed.data.datasets[0].data, vec![0, 0, 0, 1, 0, 0, 0]);
    }
}
