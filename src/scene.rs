//! Styled glyphs for one timestep.
//!
//! A [`Scene`] is what a frame draws: the visible layers, bottom first, each
//! reduced to shapes with a color and optional value. Lookup misses skip their
//! glyph and are collected on the scene for the caller to report.

use crate::color::{Quantize, Rgb};
use crate::config::AggregationConfig;
use crate::data::{CellRecord, DashboardData, EvData, Feature, Position, VoltageData};
use crate::error::LookupMiss;
use crate::layers::aggregate::{self, Aggregation, BinShape};
use crate::layers::{styling, LayerId, LayerSet};

/// Bus marker radius.
const BUS_RADIUS_M: f64 = 4.0;
/// School marker radius.
const SITE_RADIUS_M: f64 = 300.0;
/// Footprint radius of a load column.
const COLUMN_RADIUS_M: f64 = 500.0;

/// Geometry of one glyph, in (lon, lat) degrees unless noted.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Filled circle with a radius in metres.
    Circle { at: Position, radius_m: f64 },
    Path(Vec<Position>),
    /// Polygon ring; the last vertex joins back to the first.
    Ring(Vec<Position>),
    /// Marker drawn as a single letter.
    Icon { at: Position, symbol: char, size_m: f64 },
    /// Cell whose token did not decode; it has no coordinates to place.
    Cell { token: String },
    Column {
        at: Position,
        radius_m: f64,
        elevation: f64,
    },
    /// Aggregated bin.
    Bin {
        center: Position,
        shape: BinShape,
        count: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub layer: LayerId,
    /// Bus name, site id, cell token or bin coordinates.
    pub entity: Option<String>,
    pub shape: Shape,
    pub color: Rgb,
    /// The looked-up or aggregated number this glyph encodes.
    pub value: Option<f64>,
}

impl Glyph {
    /// Primary size: radius or icon size in metres, column elevation, or bin size in degrees.
    pub fn size(&self) -> Option<f64> {
        match &self.shape {
            Shape::Circle { radius_m, .. } => Some(*radius_m),
            Shape::Icon { size_m, .. } => Some(*size_m),
            Shape::Column { elevation, .. } => Some(*elevation),
            Shape::Bin { shape, .. } => Some(match shape {
                BinShape::Square { size } => *size,
                BinShape::Hex { radius } => *radius,
            }),
            Shape::Path(_) | Shape::Ring(_) | Shape::Cell { .. } => None,
        }
    }

    /// Representative position, if the glyph has one.
    pub fn anchor(&self) -> Option<Position> {
        match &self.shape {
            Shape::Circle { at, .. } | Shape::Icon { at, .. } | Shape::Column { at, .. } => Some(*at),
            Shape::Bin { center, .. } => Some(*center),
            Shape::Path(ps) => ps.first().copied(),
            Shape::Ring(ps) if !ps.is_empty() => {
                let n = ps.len() as f64;
                let (x, y) = ps.iter().fold((0.0, 0.0), |(x, y), (px, py)| (x + px, y + py));
                Some((x / n, y / n))
            }
            Shape::Ring(_) | Shape::Cell { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub timestep: usize,
    /// Glyphs in draw order, bottom first.
    pub glyphs: Vec<Glyph>,
    pub misses: Vec<LookupMiss>,
}

impl Scene {
    /// Styles every visible layer at `timestep`.
    ///
    /// Layers that belong to the other dashboard are ignored.
    pub fn build(
        data: &DashboardData,
        timestep: usize,
        layers: &LayerSet,
        aggregation: &AggregationConfig,
    ) -> Self {
        let mut builder = Builder {
            timestep,
            aggregation,
            scene: Scene {
                timestep,
                ..Scene::default()
            },
            site_weights: None,
        };
        for layer in layers.visible_in_draw_order() {
            match data {
                DashboardData::Voltage(d) => builder.voltage_layer(d, layer),
                DashboardData::Ev(d) => builder.ev_layer(d, layer),
            }
        }
        builder.scene
    }

    pub fn layer(&self, id: LayerId) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter().filter(move |g| g.layer == id)
    }

    /// Mean, min and max of the values on one layer.
    pub fn stats(&self, id: LayerId) -> Option<LayerStats> {
        let mut stats: Option<LayerStats> = None;
        for v in self.layer(id).filter_map(|g| g.value).filter(|v| v.is_finite()) {
            let s = stats.get_or_insert(LayerStats {
                count: 0,
                sum: 0.0,
                min: v,
                max: v,
            });
            s.count += 1;
            s.sum += v;
            s.min = s.min.min(v);
            s.max = s.max.max(v);
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStats {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl LayerStats {
    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

struct Builder<'a> {
    timestep: usize,
    aggregation: &'a AggregationConfig,
    scene: Scene,
    /// Per-site (lon, lat, kW) shared by the aggregate layers; misses are recorded once.
    site_weights: Option<Vec<(f64, f64, f64)>>,
}

impl Builder<'_> {
    fn push(&mut self, layer: LayerId, entity: Option<String>, shape: Shape, color: Rgb, value: Option<f64>) {
        self.scene.glyphs.push(Glyph {
            layer,
            entity,
            shape,
            color,
            value,
        });
    }

    fn voltage_layer(&mut self, d: &VoltageData, layer: LayerId) {
        match layer {
            LayerId::Lines => {
                for f in &d.lines {
                    for path in paths(f) {
                        self.push(layer, f.text_property("name"), Shape::Path(path), Rgb::WHITE, None);
                    }
                }
            }
            LayerId::Buses => {
                for f in &d.buses {
                    for at in points(f) {
                        let shape = Shape::Circle {
                            at,
                            radius_m: BUS_RADIUS_M,
                        };
                        self.push(layer, f.text_property("bus"), shape, Rgb::WHITE, None);
                    }
                }
            }
            LayerId::VoltageGlyphs => {
                for f in &d.buses {
                    let Some((bus, v)) = self.bus_voltage(d, f) else {
                        continue;
                    };
                    for at in points(f) {
                        let shape = Shape::Circle {
                            at,
                            radius_m: styling::voltage_radius_m(v),
                        };
                        self.push(layer, Some(bus.clone()), shape, styling::voltage_color(v), Some(v));
                    }
                }
            }
            LayerId::Voronoi => {
                for f in &d.voronoi {
                    let Some((bus, v)) = self.bus_voltage(d, f) else {
                        continue;
                    };
                    for ring in paths(f) {
                        self.push(layer, Some(bus.clone()), Shape::Ring(ring), styling::voltage_color(v), Some(v));
                    }
                }
            }
            LayerId::H3Hexes => self.cells(layer, &d.h3),
            LayerId::S2Tiles => self.cells(layer, &d.s2),
            LayerId::Contours => {
                let shape = BinShape::Square {
                    size: self.aggregation.contour_cell_deg,
                };
                let weighted = d.contours.iter().filter_map(|f| {
                    let (x, y) = f.geometry.as_ref()?.anchor()?;
                    Some((x, y, f.number_property("voltage")?))
                });
                let bins = aggregate::aggregate(weighted, shape, Aggregation::Mean);
                self.bins(layer, bins, shape, &Quantize::voltage_contours());
            }
            LayerId::Currents => {
                for f in &d.lines {
                    let current = f.number_property("current").unwrap_or(f64::NAN);
                    for path in paths(f) {
                        let color = styling::current_color(current);
                        self.push(layer, f.text_property("name"), Shape::Path(path), color, Some(current));
                    }
                }
            }
            LayerId::EvStations => self.icons(layer, &d.ev_stations, 'E', 60.0),
            LayerId::Pv => self.icons(layer, &d.pv, 'P', 9.0),
            LayerId::Storage => self.icons(layer, &d.storage, 'S', 21.0),
            LayerId::Transformers => self.icons(layer, &d.transformers, 'T', 9.0),
            _ => {}
        }
    }

    fn ev_layer(&mut self, d: &EvData, layer: LayerId) {
        match layer {
            LayerId::Points => {
                for f in &d.site_points {
                    for at in points(f) {
                        let shape = Shape::Circle {
                            at,
                            radius_m: SITE_RADIUS_M,
                        };
                        self.push(layer, f.text_property("ID"), shape, Rgb::WHITE, None);
                    }
                }
            }
            LayerId::LoadGlyphs => {
                for f in &d.site_points {
                    let Some(id) = f.number_property("ID").map(|id| id as i64) else {
                        continue;
                    };
                    let Some(p) = self.site_power(d, id) else {
                        continue;
                    };
                    for at in points(f) {
                        let shape = Shape::Circle {
                            at,
                            radius_m: styling::load_radius_m(p),
                        };
                        self.push(layer, Some(id.to_string()), shape, styling::load_color(p), Some(p));
                    }
                }
            }
            LayerId::Columns => {
                for site in &d.sites {
                    let Some(at) = site.position() else {
                        continue;
                    };
                    let Some(p) = self.site_power(d, site.id) else {
                        continue;
                    };
                    let shape = Shape::Column {
                        at,
                        radius_m: COLUMN_RADIUS_M,
                        elevation: styling::load_elevation(p),
                    };
                    self.push(layer, Some(site.id.to_string()), shape, styling::load_color(p), Some(p));
                }
            }
            LayerId::SiteCells => {
                for cell in &d.site_cells {
                    self.push(layer, Some(cell.token.clone()), cell_shape(cell), Rgb::WHITE, None);
                }
            }
            LayerId::Hex => {
                let shape = BinShape::Hex {
                    radius: self.aggregation.hex_radius_deg,
                };
                let bins = aggregate::aggregate(self.site_weights(d), shape, Aggregation::Sum);
                self.bins(layer, bins, shape, &styling::bin_palette());
            }
            LayerId::Grid => {
                let shape = BinShape::Square {
                    size: self.aggregation.grid_cell_deg,
                };
                let bins = aggregate::aggregate(self.site_weights(d), shape, Aggregation::Sum);
                self.bins(layer, bins, shape, &styling::bin_palette());
            }
            LayerId::Heatmap => {
                let shape = BinShape::Square {
                    size: self.aggregation.heatmap_cell_deg,
                };
                let weighted = self
                    .site_weights(d)
                    .into_iter()
                    .map(|(x, y, p)| (x, y, styling::heatmap_weight(p)));
                let bins = aggregate::aggregate(weighted, shape, Aggregation::Sum);
                self.bins(layer, bins, shape, &styling::heatmap_palette());
            }
            _ => {}
        }
    }

    /// Looks up the voltage of a feature's bus, recording a miss.
    fn bus_voltage(&mut self, d: &VoltageData, f: &Feature) -> Option<(String, f64)> {
        let bus = f.text_property("bus")?;
        match d.voltages.value(self.timestep, &bus) {
            Ok(v) => Some((bus, v)),
            Err(miss) => {
                self.scene.misses.push(miss);
                None
            }
        }
    }

    fn site_power(&mut self, d: &EvData, site: i64) -> Option<f64> {
        d.loads
            .power(self.timestep, site)
            .map_err(|miss| self.scene.misses.push(miss))
            .ok()
    }

    fn site_weights(&mut self, d: &EvData) -> Vec<(f64, f64, f64)> {
        if let Some(w) = &self.site_weights {
            return w.clone();
        }
        let mut weights = Vec::with_capacity(d.sites.len());
        for site in &d.sites {
            let Some((x, y)) = site.position() else {
                continue;
            };
            if let Some(p) = self.site_power(d, site.id) {
                weights.push((x, y, p));
            }
        }
        self.site_weights = Some(weights.clone());
        weights
    }

    fn cells(&mut self, layer: LayerId, cells: &[CellRecord]) {
        for cell in cells {
            let v = cell.voltage.unwrap_or(f64::NAN);
            let color = styling::voltage_color(v);
            self.push(layer, Some(cell.token.clone()), cell_shape(cell), color, cell.voltage);
        }
    }

    fn icons(&mut self, layer: LayerId, features: &[Feature], symbol: char, size_m: f64) {
        for f in features {
            for at in points(f) {
                let shape = Shape::Icon { at, symbol, size_m };
                self.push(layer, f.text_property("name"), shape, Rgb::WHITE, None);
            }
        }
    }

    fn bins(&mut self, layer: LayerId, bins: Vec<aggregate::Bin>, shape: BinShape, palette: &Quantize) {
        for bin in bins {
            let entity = format!("{},{}", bin.cell.0, bin.cell.1);
            let glyph_shape = Shape::Bin {
                center: bin.center,
                shape,
                count: bin.count,
            };
            self.push(layer, Some(entity), glyph_shape, palette.color(bin.value), Some(bin.value));
        }
    }
}

/// The decoded cell outline, or the bare token when it did not decode.
fn cell_shape(cell: &CellRecord) -> Shape {
    match &cell.boundary {
        Some(ring) => Shape::Ring(ring.clone()),
        None => Shape::Cell {
            token: cell.token.clone(),
        },
    }
}

fn points(f: &Feature) -> Vec<Position> {
    f.geometry.as_ref().map(|g| g.points()).unwrap_or_default()
}

fn paths(f: &Feature) -> Vec<Vec<Position>> {
    f.geometry.as_ref().map(|g| g.paths()).unwrap_or_default()
}
