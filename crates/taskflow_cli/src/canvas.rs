use taskflow_core::chart::{ChartBackend, ChartConfig, ChartId, UpdateMode};
use taskflow_core::error::AppError;

/// Chart backend for the terminal. It has no pixels to draw on, so it keeps
/// the surface names and leaves the configs on the adapter for printing.
#[derive(Debug, Default)]
pub struct TerminalCanvas {
    surfaces: Vec<String>,
    redraws: usize,
}

impl TerminalCanvas {
    pub fn surfaces(&self) -> &[String] {
        &self.surfaces
    }

    pub fn redraws(&self) -> usize {
        self.redraws
    }
}

impl ChartBackend for TerminalCanvas {
    fn create(&mut self, surface: &str, config: &ChartConfig) -> Result<ChartId, AppError> {
        self.surfaces.push(surface.to_string());
        tracing::trace!(surface, kind = ?config.kind, "chart created");
        Ok(ChartId(self.surfaces.len() - 1))
    }

    fn update(
        &mut self,
        chart: ChartId,
        config: &ChartConfig,
        mode: UpdateMode,
    ) -> Result<(), AppError> {
        let surface = self
            .surfaces
            .get(chart.0)
            .ok_or_else(|| AppError::invalid_input(format!("unknown chart {}", chart.0)))?;
        if mode == UpdateMode::Redraw {
            self.redraws += 1;
        }
        tracing::trace!(surface = %surface, labels = config.data.labels.len(), ?mode, "chart updated");
        Ok(())
    }
}
