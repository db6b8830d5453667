//! Layer catalog, visibility toggles, styling functions, and spatial bins.

pub mod aggregate;
pub mod styling;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DashboardKind;

/// Every layer either dashboard can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerId {
    Lines,
    Buses,
    VoltageGlyphs,
    H3Hexes,
    S2Tiles,
    Voronoi,
    Contours,
    Currents,
    EvStations,
    Pv,
    Storage,
    Transformers,
    Points,
    LoadGlyphs,
    Columns,
    Hex,
    SiteCells,
    Grid,
    Heatmap,
}

impl LayerId {
    /// Configuration key (`snake_case`).
    pub fn key(self) -> &'static str {
        match self {
            Self::Lines => "lines",
            Self::Buses => "buses",
            Self::VoltageGlyphs => "voltage_glyphs",
            Self::H3Hexes => "h3_hexes",
            Self::S2Tiles => "s2_tiles",
            Self::Voronoi => "voronoi",
            Self::Contours => "contours",
            Self::Currents => "currents",
            Self::EvStations => "ev_stations",
            Self::Pv => "pv",
            Self::Storage => "storage",
            Self::Transformers => "transformers",
            Self::Points => "points",
            Self::LoadGlyphs => "load_glyphs",
            Self::Columns => "columns",
            Self::Hex => "hex",
            Self::SiteCells => "site_cells",
            Self::Grid => "grid",
            Self::Heatmap => "heatmap",
        }
    }
}

/// The data file a layer draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Lines,
    Buses,
    H3,
    S2,
    Voronoi,
    Contours,
    EvStations,
    Pv,
    Storage,
    Transformers,
    SitePoints,
    Sites,
    SiteCells,
}

impl SourceKey {
    /// Field name under `[data]`.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Lines => "lines",
            Self::Buses => "buses",
            Self::H3 => "h3",
            Self::S2 => "s2",
            Self::Voronoi => "voronoi",
            Self::Contours => "contours",
            Self::EvStations => "ev_stations",
            Self::Pv => "pv",
            Self::Storage => "storage",
            Self::Transformers => "transformers",
            Self::SitePoints => "site_points",
            Self::Sites => "sites",
            Self::SiteCells => "site_cells",
        }
    }
}

/// Static description of one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSpec {
    pub id: LayerId,
    /// Button label. A trailing `*` marks layers driven by the current timestep.
    pub label: &'static str,
    pub hotkey: char,
    pub default_visible: bool,
    pub source: SourceKey,
    pub opacity: f64,
}

const fn entry(
    id: LayerId,
    label: &'static str,
    hotkey: char,
    default_visible: bool,
    source: SourceKey,
    opacity: f64,
) -> LayerSpec {
    LayerSpec {
        id,
        label,
        hotkey,
        default_visible,
        source,
        opacity,
    }
}

const VOLTAGE_CATALOG: [LayerSpec; 12] = [
    entry(LayerId::Lines, "Lines", 'l', true, SourceKey::Lines, 0.1),
    entry(LayerId::Buses, "Buses", 'b', true, SourceKey::Buses, 0.1),
    entry(LayerId::VoltageGlyphs, "Glyphs*", 'g', false, SourceKey::Buses, 0.8),
    entry(LayerId::H3Hexes, "H3 Hexes", 'h', false, SourceKey::H3, 0.6),
    entry(LayerId::S2Tiles, "S2 Tiles", 's', false, SourceKey::S2, 0.6),
    entry(LayerId::Voronoi, "Voronoi*", 'v', true, SourceKey::Voronoi, 0.6),
    entry(LayerId::Contours, "Contours", 'c', false, SourceKey::Contours, 0.8),
    entry(LayerId::Currents, "Currents", 'i', false, SourceKey::Lines, 1.0),
    entry(LayerId::EvStations, "EV Stations", 'e', false, SourceKey::EvStations, 0.5),
    entry(LayerId::Pv, "PV", 'p', false, SourceKey::Pv, 0.5),
    entry(LayerId::Storage, "Storage", 'o', false, SourceKey::Storage, 0.5),
    entry(LayerId::Transformers, "Transformers", 't', false, SourceKey::Transformers, 0.5),
];

/// Bottom-to-top draw order for the voltage dashboard.
const VOLTAGE_DRAW_ORDER: [LayerId; 12] = [
    LayerId::Contours,
    LayerId::Voronoi,
    LayerId::S2Tiles,
    LayerId::H3Hexes,
    LayerId::VoltageGlyphs,
    LayerId::Buses,
    LayerId::EvStations,
    LayerId::Storage,
    LayerId::Pv,
    LayerId::Transformers,
    LayerId::Currents,
    LayerId::Lines,
];

const EV_CATALOG: [LayerSpec; 7] = [
    entry(LayerId::Points, "Points", 'p', true, SourceKey::SitePoints, 1.0),
    entry(LayerId::LoadGlyphs, "Glyphs*", 'g', false, SourceKey::SitePoints, 1.0),
    entry(LayerId::Columns, "Columns*", 'c', false, SourceKey::Sites, 0.9),
    entry(LayerId::Hex, "Hex*", 'x', false, SourceKey::Sites, 0.9),
    entry(LayerId::SiteCells, "H3", 'h', false, SourceKey::SiteCells, 0.1),
    entry(LayerId::Grid, "Grid*", 'd', false, SourceKey::Sites, 0.9),
    entry(LayerId::Heatmap, "Heatmap*", 'm', true, SourceKey::Sites, 1.0),
];

/// Bottom-to-top draw order for the EV dashboard.
const EV_DRAW_ORDER: [LayerId; 7] = [
    LayerId::Columns,
    LayerId::Hex,
    LayerId::SiteCells,
    LayerId::Grid,
    LayerId::Heatmap,
    LayerId::LoadGlyphs,
    LayerId::Points,
];

/// Layers of a dashboard in button order.
pub fn catalog(kind: DashboardKind) -> &'static [LayerSpec] {
    match kind {
        DashboardKind::Voltage => &VOLTAGE_CATALOG,
        DashboardKind::Ev => &EV_CATALOG,
    }
}

/// Layers of a dashboard in draw order, bottom first.
pub fn draw_order(kind: DashboardKind) -> &'static [LayerId] {
    match kind {
        DashboardKind::Voltage => &VOLTAGE_DRAW_ORDER,
        DashboardKind::Ev => &EV_DRAW_ORDER,
    }
}

/// Catalog entry for `id`, if the dashboard has it.
pub fn spec_for(kind: DashboardKind, id: LayerId) -> Option<&'static LayerSpec> {
    catalog(kind).iter().find(|s| s.id == id)
}

/// Visibility toggles for one dashboard's catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSet {
    kind: DashboardKind,
    visible: BTreeSet<LayerId>,
}

impl LayerSet {
    /// Starts with the given layers visible; ids outside the catalog are ignored.
    pub fn new(kind: DashboardKind, visible: impl IntoIterator<Item = LayerId>) -> Self {
        let visible = visible
            .into_iter()
            .filter(|id| spec_for(kind, *id).is_some())
            .collect();
        Self { kind, visible }
    }

    pub fn kind(&self) -> DashboardKind {
        self.kind
    }

    pub fn is_visible(&self, id: LayerId) -> bool {
        self.visible.contains(&id)
    }

    /// Flips a layer. Returns the new visibility, or `None` for a layer outside the catalog.
    pub fn toggle(&mut self, id: LayerId) -> Option<bool> {
        spec_for(self.kind, id)?;
        let now_visible = if self.visible.remove(&id) {
            false
        } else {
            self.visible.insert(id);
            true
        };
        debug!(layer = id.key(), visible = now_visible, "layer toggled");
        Some(now_visible)
    }

    /// Flips the layer bound to `hotkey`.
    pub fn toggle_hotkey(&mut self, hotkey: char) -> Option<bool> {
        let id = catalog(self.kind).iter().find(|s| s.hotkey == hotkey)?.id;
        self.toggle(id)
    }

    /// Visible layers in draw order, bottom first.
    pub fn visible_in_draw_order(&self) -> impl Iterator<Item = LayerId> + '_ {
        draw_order(self.kind)
            .iter()
            .copied()
            .filter(|id| self.visible.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const KINDS: [DashboardKind; 2] = [DashboardKind::Voltage, DashboardKind::Ev];

    #[test]
    fn hotkeys_are_unique_per_dashboard() {
        for kind in KINDS {
            let keys: HashSet<char> = catalog(kind).iter().map(|s| s.hotkey).collect();
            assert_eq!(keys.len(), catalog(kind).len(), "{kind}");
        }
    }

    #[test]
    fn hotkeys_avoid_playback_keys() {
        for kind in KINDS {
            for s in catalog(kind) {
                assert!(
                    !"qrf ".contains(s.hotkey),
                    "{kind}: hotkey {:?} clashes with a control key",
                    s.hotkey
                );
            }
        }
    }

    #[test]
    fn draw_order_covers_catalog() {
        for kind in KINDS {
            let mut cat: Vec<LayerId> = catalog(kind).iter().map(|s| s.id).collect();
            let mut order = draw_order(kind).to_vec();
            cat.sort();
            order.sort();
            assert_eq!(cat, order, "{kind}");
        }
    }

    #[test]
    fn toggle_flips_visibility() {
        let mut set = LayerSet::new(DashboardKind::Voltage, [LayerId::Lines]);
        assert!(set.is_visible(LayerId::Lines));
        assert_eq!(set.toggle(LayerId::Lines), Some(false));
        assert!(!set.is_visible(LayerId::Lines));
        assert_eq!(set.toggle_hotkey('g'), Some(true));
        assert!(set.is_visible(LayerId::VoltageGlyphs));
    }

    #[test]
    fn toggling_foreign_layer_is_noop() {
        let mut set = LayerSet::new(DashboardKind::Ev, [LayerId::Voronoi, LayerId::Points]);
        assert!(!set.is_visible(LayerId::Voronoi));
        assert_eq!(set.toggle(LayerId::Voronoi), None);
        assert!(!set.is_visible(LayerId::Voronoi));
        assert_eq!(set.toggle_hotkey('z'), None);
    }

    #[test]
    fn visible_layers_follow_draw_order() {
        let set = LayerSet::new(
            DashboardKind::Voltage,
            [LayerId::Lines, LayerId::Contours, LayerId::Buses],
        );
        let order: Vec<LayerId> = set.visible_in_draw_order().collect();
        assert_eq!(order, vec![LayerId::Contours, LayerId::Buses, LayerId::Lines]);
    }
}
