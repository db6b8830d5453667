//! Pure styling functions: one looked-up value in, one color or size out.

use crate::color::{ColorScale, Quantize, Rgb};

/// Metres per degree of latitude, used to size glyphs on a degree-scaled map.
pub const METRES_PER_DEGREE: f64 = 111_320.0;

/// Scale position for a per-unit voltage: 1.0 p.u. sits at the white midpoint,
/// over-voltage runs red and under-voltage runs blue. `[0.975, 1.025]` covers `[0, 1]`.
pub fn voltage_scale_position(voltage: f64) -> f64 {
    -20.0 * (voltage - 1.0) + 0.5
}

/// Fill color for a bus voltage.
pub fn voltage_color(voltage: f64) -> Rgb {
    ColorScale::RdBu.at(voltage_scale_position(voltage))
}

/// Glyph radius in metres: distance from nominal voltage.
pub fn voltage_radius_m(voltage: f64) -> f64 {
    400.0 * (voltage - 1.0).abs()
}

/// Line color for a (normalized) line current.
pub fn current_color(current: f64) -> Rgb {
    ColorScale::RdPu.at(current)
}

/// Scale position for a site load in kW: 0 kW is blue end, 800 kW is red end.
pub fn load_scale_position(power_kw: f64) -> f64 {
    1.0 - power_kw / 800.0
}

/// Fill color for a site load.
pub fn load_color(power_kw: f64) -> Rgb {
    ColorScale::RdBu.at(load_scale_position(power_kw))
}

/// Glyph radius in metres for a site load.
pub fn load_radius_m(power_kw: f64) -> f64 {
    3.0 * (power_kw + 100.0)
}

/// Column height for a site load.
pub fn load_elevation(power_kw: f64) -> f64 {
    power_kw
}

/// Palette for hex and grid bins (summed kW).
pub fn bin_palette() -> Quantize {
    Quantize::load(0.0, 1000.0)
}

/// Palette for heatmap cells, over per-bin weights in hundreds of kW.
pub fn heatmap_palette() -> Quantize {
    Quantize::load(0.1, 5.0)
}

/// Heatmap weight for a summed load: hundreds of kW, so a few busy sites
/// span the palette domain without a density kernel.
pub fn heatmap_weight(power_kw: f64) -> f64 {
    power_kw / 100.0
}
