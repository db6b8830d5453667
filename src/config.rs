//! TOML-based dashboard configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::layers::{self, LayerId, SourceKey};
use crate::playback::MAX_SPEED;

/// Base URL of the published simulation outputs.
const DATA_BASE: &str = "https://raw.githubusercontent.com/geohai/vite-vis-dss/main/data";

/// Which of the two dashboards to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardKind {
    /// Feeder bus voltages, 288 five-minute steps per day.
    #[default]
    Voltage,
    /// School EV-charging loads, 168 hourly steps per week.
    Ev,
}

impl DashboardKind {
    /// Preset name matching this kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Voltage => "voltage",
            Self::Ev => "ev",
        }
    }
}

impl fmt::Display for DashboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Top-level dashboard configuration parsed from TOML.
///
/// A file only needs to name the fields it changes: everything else is taken
/// from the preset matching `dashboard.kind`. Load with
/// [`DashboardConfig::from_toml_file`] or start from
/// [`DashboardConfig::from_preset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    #[serde(default)]
    pub dashboard: DashboardSection,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub layers: LayersConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// Dashboard identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardSection {
    pub kind: DashboardKind,
    /// Title shown in the header bar.
    pub title: String,
}

/// Initial playback state and wraparound horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Number of timesteps before wraparound (must be > 0).
    pub horizon: usize,
    /// Timestep shown at startup and after restart.
    pub initial_timestep: usize,
    /// Whether playback starts running.
    pub animate: bool,
    /// Ticks per second (1 to 1024).
    pub speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            horizon: 288,
            initial_timestep: 0,
            animate: false,
            speed: 1.0,
        }
    }
}

/// Data sources. Each entry is an `http(s)://` URL or a local path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Per-entity metric table (wide voltages or long loads).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
    /// Timestep to wall-clock time table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buses: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voronoi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contours: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_stations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformers: Option<String>,
    /// Site features as GeoJSON (properties carry `ID`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_points: Option<String>,
    /// Site records with top-level `ID` and point geometry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sites: Option<String>,
    /// Cell tokens covering the sites.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_cells: Option<String>,
}

impl DataConfig {
    /// Returns the configured source for a layer data key.
    pub fn source(&self, key: SourceKey) -> Option<&str> {
        let slot = match key {
            SourceKey::Lines => &self.lines,
            SourceKey::Buses => &self.buses,
            SourceKey::H3 => &self.h3,
            SourceKey::S2 => &self.s2,
            SourceKey::Voronoi => &self.voronoi,
            SourceKey::Contours => &self.contours,
            SourceKey::EvStations => &self.ev_stations,
            SourceKey::Pv => &self.pv,
            SourceKey::Storage => &self.storage,
            SourceKey::Transformers => &self.transformers,
            SourceKey::SitePoints => &self.site_points,
            SourceKey::Sites => &self.sites,
            SourceKey::SiteCells => &self.site_cells,
        };
        slot.as_deref()
    }

    /// Rewrites every source to `<dir>/<file name>` for offline use.
    pub fn relocate(&mut self, dir: &Path) {
        for slot in [
            &mut self.metrics,
            &mut self.times,
            &mut self.lines,
            &mut self.buses,
            &mut self.h3,
            &mut self.s2,
            &mut self.voronoi,
            &mut self.contours,
            &mut self.ev_stations,
            &mut self.pv,
            &mut self.storage,
            &mut self.transformers,
            &mut self.site_points,
            &mut self.sites,
            &mut self.site_cells,
        ] {
            if let Some(src) = slot.as_mut() {
                let name = src.rsplit('/').next().unwrap_or(src.as_str());
                *src = dir.join(name).to_string_lossy().into_owned();
            }
        }
    }
}

/// Initial map view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub max_zoom: f64,
    /// Camera pitch (degrees). Carried for completeness; the terminal map is flat.
    pub pitch: f64,
    /// Camera bearing (degrees). Carried for completeness; the terminal map is north-up.
    pub bearing: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            latitude: 37.817,
            longitude: -122.242,
            zoom: 16.0,
            max_zoom: 20.0,
            pitch: 60.0,
            bearing: 0.0,
        }
    }
}

/// Layers visible at startup. Empty means the catalog defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayersConfig {
    pub visible: Vec<LayerId>,
}

/// Bin sizes for the aggregation layers, in degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    pub contour_cell_deg: f64,
    pub grid_cell_deg: f64,
    pub hex_radius_deg: f64,
    pub heatmap_cell_deg: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            contour_cell_deg: 0.000_15,
            grid_cell_deg: 0.05,
            hex_radius_deg: 0.03,
            heatmap_cell_deg: 0.02,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"playback.horizon"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl DashboardConfig {
    /// Available preset names.
    pub const PRESETS: &[&str] = &["voltage", "ev"];

    /// Returns the feeder voltage dashboard.
    pub fn voltage() -> Self {
        Self {
            dashboard: DashboardSection {
                kind: DashboardKind::Voltage,
                title: "Feeder Voltages".to_string(),
            },
            playback: PlaybackConfig::default(),
            data: DataConfig {
                metrics: Some(format!("{DATA_BASE}/csv/bus_voltages_all.csv")),
                times: Some(format!("{DATA_BASE}/csv/time_steps.csv")),
                lines: Some(format!("{DATA_BASE}/json/lines.geo.json")),
                buses: Some(format!("{DATA_BASE}/json/buses.geo.json")),
                h3: Some(format!("{DATA_BASE}/json/h3r10.json")),
                s2: Some(format!("{DATA_BASE}/json/s2r17.json")),
                voronoi: Some(format!("{DATA_BASE}/json/voronoi.geo.json")),
                contours: Some(format!("{DATA_BASE}/json/contours.json")),
                ev_stations: Some(format!("{DATA_BASE}/json/evstations.geo.json")),
                pv: Some(format!("{DATA_BASE}/json/pv.geo.json")),
                storage: Some(format!("{DATA_BASE}/json/storage.geo.json")),
                transformers: Some(format!("{DATA_BASE}/json/tx.geo.json")),
                ..DataConfig::default()
            },
            view: ViewConfig::default(),
            layers: LayersConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }

    /// Returns the school EV-charging dashboard.
    pub fn ev() -> Self {
        Self {
            dashboard: DashboardSection {
                kind: DashboardKind::Ev,
                title: "EV Charging at Scale".to_string(),
            },
            playback: PlaybackConfig {
                horizon: 168,
                initial_timestep: 24,
                animate: true,
                speed: 16.0,
            },
            data: DataConfig {
                metrics: Some(format!("{DATA_BASE}/evsatscale/hourly_load_timesteps.csv")),
                site_points: Some(format!("{DATA_BASE}/evsatscale/schools.geo.json")),
                sites: Some(format!("{DATA_BASE}/evsatscale/schools.json")),
                site_cells: Some(format!("{DATA_BASE}/evsatscale/schools_h3.json")),
                ..DataConfig::default()
            },
            view: ViewConfig {
                latitude: 37.2,
                longitude: -76.9,
                zoom: 9.5,
                ..ViewConfig::default()
            },
            layers: LayersConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "voltage" => Ok(Self::voltage()),
            "ev" => Ok(Self::ev()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// The file is laid over the preset named by `dashboard.kind` (default
    /// `voltage`), so unspecified fields keep that preset's values.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let toml_err = |e: &dyn fmt::Display| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        };
        let overlay: toml::Table = toml::from_str(s).map_err(|e| toml_err(&e))?;

        let kind = match overlay
            .get("dashboard")
            .and_then(|d| d.get("kind"))
            .and_then(toml::Value::as_str)
        {
            None => DashboardKind::Voltage,
            Some(name) => Self::from_preset(name)
                .map(|c| c.dashboard.kind)
                .map_err(|_| ConfigError {
                    field: "dashboard.kind".to_string(),
                    message: format!("must be \"voltage\" or \"ev\", got \"{name}\""),
                })?,
        };

        let toml::Value::Table(mut base) =
            toml::Value::try_from(Self::from_preset(kind.name())?).map_err(|e| toml_err(&e))?
        else {
            return Err(toml_err(&"preset did not serialize to a table"));
        };
        merge_tables(&mut base, overlay);
        toml::Value::Table(base)
            .try_into()
            .map_err(|e: toml::de::Error| toml_err(&e))
    }

    /// Layers visible at startup: the configured list, or the catalog defaults.
    pub fn initial_layers(&self) -> Vec<LayerId> {
        if self.layers.visible.is_empty() {
            layers::catalog(self.dashboard.kind)
                .iter()
                .filter(|spec| spec.default_visible)
                .map(|spec| spec.id)
                .collect()
        } else {
            self.layers.visible.clone()
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let kind = self.dashboard.kind;
        let p = &self.playback;

        if p.horizon == 0 {
            errors.push(ConfigError {
                field: "playback.horizon".into(),
                message: "must be > 0".into(),
            });
        } else if p.initial_timestep >= p.horizon {
            errors.push(ConfigError {
                field: "playback.initial_timestep".into(),
                message: format!("must be < playback.horizon ({})", p.horizon),
            });
        }
        if !(1.0..=MAX_SPEED).contains(&p.speed) {
            errors.push(ConfigError {
                field: "playback.speed".into(),
                message: format!("must be in [1, {MAX_SPEED}]"),
            });
        }

        let d = &self.data;
        if d.metrics.as_deref().is_none_or(str::is_empty) {
            errors.push(ConfigError {
                field: "data.metrics".into(),
                message: "is required".into(),
            });
        }
        if kind == DashboardKind::Voltage && d.times.as_deref().is_none_or(str::is_empty) {
            errors.push(ConfigError {
                field: "data.times".into(),
                message: "is required for the voltage dashboard".into(),
            });
        }
        for spec in layers::catalog(kind) {
            if d.source(spec.source).is_none_or(str::is_empty) {
                errors.push(ConfigError {
                    field: format!("data.{}", spec.source.field_name()),
                    message: format!("is required by layer \"{}\"", spec.label),
                });
            }
        }

        for id in &self.layers.visible {
            if layers::spec_for(kind, *id).is_none() {
                errors.push(ConfigError {
                    field: "layers.visible".into(),
                    message: format!("layer \"{}\" is not part of the {kind} dashboard", id.key()),
                });
            }
        }

        let v = &self.view;
        if !(-90.0..=90.0).contains(&v.latitude) {
            errors.push(ConfigError {
                field: "view.latitude".into(),
                message: "must be in [-90, 90]".into(),
            });
        }
        if !(-180.0..=180.0).contains(&v.longitude) {
            errors.push(ConfigError {
                field: "view.longitude".into(),
                message: "must be in [-180, 180]".into(),
            });
        }
        if v.zoom < 0.0 || v.zoom > v.max_zoom {
            errors.push(ConfigError {
                field: "view.zoom".into(),
                message: "must be in [0, view.max_zoom]".into(),
            });
        }

        let a = &self.aggregation;
        for (field, size) in [
            ("aggregation.contour_cell_deg", a.contour_cell_deg),
            ("aggregation.grid_cell_deg", a.grid_cell_deg),
            ("aggregation.hex_radius_deg", a.hex_radius_deg),
            ("aggregation.heatmap_cell_deg", a.heatmap_cell_deg),
        ] {
            if size.is_nan() || size <= 0.0 {
                errors.push(ConfigError {
                    field: field.into(),
                    message: "must be > 0".into(),
                });
            }
        }

        errors
    }
}

/// Recursively lays `overlay` over `base`; nested tables merge, other values replace.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(b)), toml::Value::Table(o)) => merge_tables(b, o),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_presets_are_valid() {
        for name in DashboardConfig::PRESETS {
            let cfg = DashboardConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn from_preset_unknown() {
        let err = DashboardConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn presets_carry_their_horizons() {
        assert_eq!(DashboardConfig::voltage().playback.horizon, 288);
        let ev = DashboardConfig::ev();
        assert_eq!(ev.playback.horizon, 168);
        assert_eq!(ev.playback.initial_timestep, 24);
        assert!(ev.playback.animate);
        assert_eq!(ev.playback.speed, 16.0);
    }

    #[test]
    fn partial_toml_uses_kind_defaults() {
        let toml = r#"
[dashboard]
kind = "ev"

[playback]
speed = 4.0
"#;
        let cfg = DashboardConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "partial TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        // overridden
        assert_eq!(cfg.as_ref().map(|c| c.playback.speed), Some(4.0));
        // kept from the ev preset
        assert_eq!(cfg.as_ref().map(|c| c.playback.horizon), Some(168));
        assert_eq!(cfg.as_ref().map(|c| c.view.latitude), Some(37.2));
        assert!(cfg.as_ref().is_some_and(|c| c.data.sites.is_some()));
    }

    #[test]
    fn empty_toml_is_voltage_preset() {
        let cfg = DashboardConfig::from_toml_str("").ok();
        assert_eq!(
            cfg.as_ref().map(|c| c.dashboard.kind),
            Some(DashboardKind::Voltage)
        );
        assert_eq!(cfg.as_ref().map(|c| c.playback.horizon), Some(288));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[playback]
horizon = 24
bogus_field = true
"#;
        assert!(DashboardConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let toml = r#"
[dashboard]
kind = "solar"
"#;
        let err = DashboardConfig::from_toml_str(toml).err();
        assert_eq!(err.map(|e| e.field), Some("dashboard.kind".to_string()));
    }

    #[test]
    fn layers_parse_from_toml() {
        let toml = r#"
[layers]
visible = ["lines", "contours"]
"#;
        let cfg = DashboardConfig::from_toml_str(toml).ok();
        assert_eq!(
            cfg.map(|c| c.initial_layers()),
            Some(vec![LayerId::Lines, LayerId::Contours])
        );
    }

    #[test]
    fn validation_catches_zero_horizon() {
        let mut cfg = DashboardConfig::voltage();
        cfg.playback.horizon = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "playback.horizon"));
    }

    #[test]
    fn validation_catches_initial_timestep_past_horizon() {
        let mut cfg = DashboardConfig::ev();
        cfg.playback.initial_timestep = 168;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "playback.initial_timestep"));
    }

    #[test]
    fn validation_catches_speed_below_one() {
        let mut cfg = DashboardConfig::voltage();
        cfg.playback.speed = 0.5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "playback.speed"));
    }

    #[test]
    fn validation_catches_missing_layer_source() {
        let mut cfg = DashboardConfig::voltage();
        cfg.data.voronoi = None;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "data.voronoi"));
    }

    #[test]
    fn validation_catches_layer_from_other_dashboard() {
        let mut cfg = DashboardConfig::ev();
        cfg.layers.visible = vec![LayerId::Voronoi];
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "layers.visible"));
    }

    #[test]
    fn ev_does_not_require_times() {
        let cfg = DashboardConfig::ev();
        assert!(cfg.data.times.is_none());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn relocate_keeps_file_names() {
        let mut data = DashboardConfig::voltage().data;
        data.relocate(Path::new("/tmp/grid"));
        assert_eq!(
            data.metrics.as_deref(),
            Some("/tmp/grid/bus_voltages_all.csv")
        );
        assert_eq!(data.buses.as_deref(), Some("/tmp/grid/buses.geo.json"));
        assert!(data.site_points.is_none());
    }

    #[test]
    fn default_layers_follow_catalog() {
        let layers = DashboardConfig::voltage().initial_layers();
        assert_eq!(
            layers,
            vec![LayerId::Lines, LayerId::Buses, LayerId::Voronoi]
        );
        let layers = DashboardConfig::ev().initial_layers();
        assert_eq!(layers, vec![LayerId::Points, LayerId::Heatmap]);
    }
}
