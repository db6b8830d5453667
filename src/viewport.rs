//! Map view over plain (lon, lat) axes.

use crate::config::ViewConfig;

/// Zoom change per key press.
const ZOOM_STEP: f64 = 0.5;
/// Fraction of the visible span moved per pan.
const PAN_FRACTION: f64 = 0.1;
/// Margin added around fitted data.
const FIT_PADDING: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    max_zoom: f64,
}

/// Visible axis ranges: `(lon_bounds, lat_bounds)`.
pub type Bounds = ([f64; 2], [f64; 2]);

impl Viewport {
    pub fn new(view: &ViewConfig) -> Self {
        Self {
            longitude: view.longitude,
            latitude: view.latitude,
            zoom: view.zoom.clamp(0.0, view.max_zoom),
            max_zoom: view.max_zoom,
        }
    }

    /// Degrees of longitude across the view: `360 / 2^zoom`.
    pub fn lon_span(&self) -> f64 {
        360.0 / 2f64.powf(self.zoom)
    }

    /// Axis ranges for a view `aspect` (width / height) wide.
    pub fn bounds(&self, aspect: f64) -> Bounds {
        let lon_span = self.lon_span();
        let lat_span = if aspect > 0.0 { lon_span / aspect } else { lon_span };
        (
            [self.longitude - lon_span / 2.0, self.longitude + lon_span / 2.0],
            [self.latitude - lat_span / 2.0, self.latitude + lat_span / 2.0],
        )
    }

    /// Moves the center by whole pan steps; positive `dx` is east, positive `dy` north.
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let step = self.lon_span() * PAN_FRACTION;
        self.longitude = wrap_longitude(self.longitude + f64::from(dx) * step);
        self.latitude = (self.latitude + f64::from(dy) * step).clamp(-90.0, 90.0);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(self.max_zoom);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - ZOOM_STEP).max(0.0);
    }

    /// Centers on `bbox` (`min_lon, min_lat, max_lon, max_lat`) and zooms to contain it.
    pub fn fit(&mut self, bbox: (f64, f64, f64, f64), aspect: f64) {
        let (x0, y0, x1, y1) = bbox;
        self.longitude = (x0 + x1) / 2.0;
        self.latitude = (y0 + y1) / 2.0;
        let needed = (x1 - x0).max((y1 - y0) * aspect.max(f64::EPSILON)) * FIT_PADDING;
        self.zoom = if needed > 0.0 && needed.is_finite() {
            (360.0 / needed).log2().clamp(0.0, self.max_zoom)
        } else {
            self.max_zoom
        };
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}
