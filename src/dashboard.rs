//! A loaded dashboard: configuration plus indexed data, and the per-timestep
//! views derived from them (clock label, scene, one-line summary).

use std::time::Instant;

use tracing::{info, warn};

use crate::config::{DashboardConfig, DashboardKind};
use crate::data::{self, DashboardData, Fetcher};
use crate::error::{GridvizError, Result};
use crate::layers::LayerSet;
use crate::playback::{self, PlaybackController};
use crate::scene::Scene;

/// Shown when the time table has no row for a timestep.
pub const MISSING_TIME_LABEL: &str = "--:--";

pub struct Dashboard {
    config: DashboardConfig,
    data: DashboardData,
}

/// Totals from a headless run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub frames: usize,
    pub glyphs: usize,
    pub misses: usize,
}

impl Dashboard {
    /// Wraps already-loaded data. The data kind must match `config.dashboard.kind`.
    pub fn new(config: DashboardConfig, data: DashboardData) -> Self {
        Self { config, data }
    }

    /// Validates the config, then fetches and indexes every source.
    ///
    /// # Errors
    ///
    /// Returns [`GridvizError::Config`] with every validation error, or the
    /// first load failure.
    pub fn load(config: DashboardConfig, fetcher: &Fetcher) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(GridvizError::Config(errors));
        }
        let started = Instant::now();
        let data = data::load(&config, fetcher)?;
        info!(
            dashboard = %config.dashboard.kind,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "data ready"
        );
        Ok(Self::new(config, data))
    }

    pub fn kind(&self) -> DashboardKind {
        self.data.kind()
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn data(&self) -> &DashboardData {
        &self.data
    }

    /// Layer toggles as configured at startup.
    pub fn initial_layers(&self) -> LayerSet {
        LayerSet::new(self.kind(), self.config.initial_layers())
    }

    /// Wall-clock time for the voltage dashboard, "Day d Hour h" for EV.
    pub fn clock_label(&self, timestep: usize) -> String {
        match &self.data {
            DashboardData::Voltage(d) => d
                .times
                .label(timestep)
                .unwrap_or(MISSING_TIME_LABEL)
                .to_string(),
            DashboardData::Ev(_) => {
                let (day, hour) = playback::day_and_hour(timestep);
                format!("Day {day} Hour {hour}")
            }
        }
    }

    /// Builds the scene for `timestep` and reports its lookup misses.
    pub fn scene(&self, timestep: usize, layers: &LayerSet) -> Scene {
        let scene = Scene::build(&self.data, timestep, layers, &self.config.aggregation);
        for miss in &scene.misses {
            warn!(timestep = miss.timestep, entity = %miss.entity, "lookup miss");
        }
        scene
    }

    /// One-line numeric summary of the metric row at `timestep`.
    pub fn headline(&self, timestep: usize) -> String {
        match &self.data {
            DashboardData::Voltage(d) => {
                let finite: Vec<f64> = d
                    .voltages
                    .row(timestep)
                    .unwrap_or_default()
                    .iter()
                    .copied()
                    .filter(|v| v.is_finite())
                    .collect();
                if finite.is_empty() {
                    return "no voltages".to_string();
                }
                let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
                let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mean = finite.iter().sum::<f64>() / finite.len() as f64;
                format!("V min={min:.4} mean={mean:.4} max={max:.4} p.u.")
            }
            DashboardData::Ev(d) => {
                let sites = d.loads.rows_at(timestep).count();
                format!("load={:.1} kW over {sites} sites", d.loads.total_at(timestep))
            }
        }
    }

    /// Plays `steps` timesteps without a terminal, starting from the configured
    /// initial timestep, and hands each scene to `sink`.
    ///
    /// # Errors
    ///
    /// Stops at the first error returned by `sink`.
    pub fn run_headless(
        &self,
        steps: usize,
        mut sink: impl FnMut(&Scene) -> Result<()>,
    ) -> Result<RunSummary> {
        let mut controller = PlaybackController::new(&self.config.playback, Instant::now());
        let layers = self.initial_layers();
        let mut summary = RunSummary::default();
        for _ in 0..steps {
            let t = controller.timestep();
            let scene = self.scene(t, &layers);
            info!(
                timestep = t,
                clock = %self.clock_label(t),
                glyphs = scene.glyphs.len(),
                misses = scene.misses.len(),
                "{}",
                self.headline(t)
            );
            sink(&scene)?;
            summary.frames += 1;
            summary.glyphs += scene.glyphs.len();
            summary.misses += scene.misses.len();
            controller.step(1);
        }
        Ok(summary)
    }
}
