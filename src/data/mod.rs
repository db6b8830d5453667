//! Data loading: every source is fetched once at startup, parsed, and indexed.

pub mod cells;
pub mod features;
pub mod fetch;
pub mod tables;

use tracing::info;

use crate::config::{DashboardConfig, DashboardKind, DataConfig};
use crate::error::{GridvizError, Result};
use crate::layers::SourceKey;

pub use cells::{CellGrid, CellRecord};
pub use features::{Feature, Geometry, Position, SitePoint};
pub use fetch::{Fetcher, Source};
pub use tables::{LoadRow, LoadTable, TimeRow, TimeTable, VoltageTable};

/// Everything the voltage dashboard draws from.
#[derive(Debug, Clone, Default)]
pub struct VoltageData {
    pub voltages: VoltageTable,
    pub times: TimeTable,
    pub lines: Vec<Feature>,
    pub buses: Vec<Feature>,
    pub voronoi: Vec<Feature>,
    pub contours: Vec<Feature>,
    pub h3: Vec<CellRecord>,
    pub s2: Vec<CellRecord>,
    pub ev_stations: Vec<Feature>,
    pub pv: Vec<Feature>,
    pub storage: Vec<Feature>,
    pub transformers: Vec<Feature>,
}

/// Everything the EV dashboard draws from.
#[derive(Debug, Clone, Default)]
pub struct EvData {
    pub loads: LoadTable,
    pub site_points: Vec<Feature>,
    pub sites: Vec<SitePoint>,
    pub site_cells: Vec<CellRecord>,
}

#[derive(Debug, Clone)]
pub enum DashboardData {
    Voltage(VoltageData),
    Ev(EvData),
}

impl DashboardData {
    pub fn kind(&self) -> DashboardKind {
        match self {
            Self::Voltage(_) => DashboardKind::Voltage,
            Self::Ev(_) => DashboardKind::Ev,
        }
    }

    /// Bounding box of the drawable features, `(min_lon, min_lat, max_lon, max_lat)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        match self {
            Self::Voltage(d) => features::bounds(d.lines.iter().chain(&d.buses)),
            Self::Ev(d) => {
                let from_points = features::bounds(&d.site_points);
                let from_sites = d.sites.iter().filter_map(SitePoint::position).fold(
                    None,
                    |acc: Option<(f64, f64, f64, f64)>, (x, y)| {
                        Some(match acc {
                            None => (x, y, x, y),
                            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                        })
                    },
                );
                match (from_points, from_sites) {
                    (Some(a), Some(b)) => {
                        Some((a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
                    }
                    (a, b) => a.or(b),
                }
            }
        }
    }
}

/// Fetches and parses every source the dashboard needs, sequentially.
///
/// Optional sources that are not configured load as empty collections;
/// `validate()` is what insists on the sources of visible layers.
///
/// # Errors
///
/// Fails on the first source that cannot be fetched or parsed.
pub fn load(cfg: &DashboardConfig, fetcher: &Fetcher) -> Result<DashboardData> {
    let data = &cfg.data;
    let metrics = required(data.metrics.as_deref(), "data.metrics")?;
    let metrics_text = fetcher.fetch_text(&Source::parse(metrics))?;

    let loaded = match cfg.dashboard.kind {
        DashboardKind::Voltage => {
            let times = required(data.times.as_deref(), "data.times")?;
            let times_text = fetcher.fetch_text(&Source::parse(times))?;
            let voltage = VoltageData {
                voltages: VoltageTable::from_csv(&metrics_text, metrics)?,
                times: TimeTable::from_csv(&times_text, times)?,
                lines: load_features(fetcher, data, SourceKey::Lines)?,
                buses: load_features(fetcher, data, SourceKey::Buses)?,
                voronoi: load_features(fetcher, data, SourceKey::Voronoi)?,
                contours: load_features(fetcher, data, SourceKey::Contours)?,
                h3: load_cells(fetcher, data, SourceKey::H3, "h3", CellGrid::H3)?,
                s2: load_cells(fetcher, data, SourceKey::S2, "s2", CellGrid::S2)?,
                ev_stations: load_features(fetcher, data, SourceKey::EvStations)?,
                pv: load_features(fetcher, data, SourceKey::Pv)?,
                storage: load_features(fetcher, data, SourceKey::Storage)?,
                transformers: load_features(fetcher, data, SourceKey::Transformers)?,
            };
            info!(
                timesteps = voltage.voltages.len(),
                buses = voltage.voltages.columns().len(),
                lines = voltage.lines.len(),
                "voltage data loaded"
            );
            DashboardData::Voltage(voltage)
        }
        DashboardKind::Ev => {
            let sites = match data.source(SourceKey::Sites) {
                Some(s) => features::parse_sites(&fetcher.fetch_text(&Source::parse(s))?, s)?,
                None => Vec::new(),
            };
            let ev = EvData {
                loads: LoadTable::from_csv(&metrics_text, metrics)?,
                site_points: load_features(fetcher, data, SourceKey::SitePoints)?,
                sites,
                site_cells: load_cells(fetcher, data, SourceKey::SiteCells, "h3r7", CellGrid::H3)?,
            };
            info!(
                rows = ev.loads.len(),
                sites = ev.sites.len(),
                "EV data loaded"
            );
            DashboardData::Ev(ev)
        }
    };
    Ok(loaded)
}

fn required<'a>(source: Option<&'a str>, field: &str) -> Result<&'a str> {
    source.ok_or_else(|| {
        GridvizError::Config(vec![crate::config::ConfigError {
            field: field.to_string(),
            message: "is required".to_string(),
        }])
    })
}

fn load_features(fetcher: &Fetcher, data: &DataConfig, key: SourceKey) -> Result<Vec<Feature>> {
    match data.source(key) {
        Some(s) => features::parse_features(&fetcher.fetch_text(&Source::parse(s))?, s),
        None => Ok(Vec::new()),
    }
}

fn load_cells(
    fetcher: &Fetcher,
    data: &DataConfig,
    key: SourceKey,
    token_field: &str,
    grid: CellGrid,
) -> Result<Vec<CellRecord>> {
    match data.source(key) {
        Some(s) => cells::parse_cells(&fetcher.fetch_text(&Source::parse(s))?, token_field, grid, s),
        None => Ok(Vec::new()),
    }
}
