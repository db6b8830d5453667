//! Planar binning of weighted points into square or hexagonal cells.
//!
//! Coordinates are plain (lon, lat) degrees; cell sizes are in degrees too.

use std::collections::HashMap;

/// How weights in one bin are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

/// Bin geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinShape {
    /// Axis-aligned squares of the given side.
    Square { size: f64 },
    /// Pointy-top hexagons of the given circumradius.
    Hex { radius: f64 },
}

/// One populated bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    /// Integer cell coordinates (column/row, or axial q/r for hexes).
    pub cell: (i64, i64),
    /// Cell center (lon, lat).
    pub center: (f64, f64),
    /// Aggregated weight.
    pub value: f64,
    /// Number of points that fell in the cell.
    pub count: usize,
}

impl BinShape {
    /// Cell containing `(x, y)`.
    pub fn cell_of(self, x: f64, y: f64) -> (i64, i64) {
        match self {
            Self::Square { size } => ((x / size).floor() as i64, (y / size).floor() as i64),
            Self::Hex { radius } => {
                let q = (3f64.sqrt() / 3.0 * x - y / 3.0) / radius;
                let r = (2.0 / 3.0 * y) / radius;
                hex_round(q, r)
            }
        }
    }

    /// Center of a cell.
    pub fn center_of(self, cell: (i64, i64)) -> (f64, f64) {
        let (a, b) = (cell.0 as f64, cell.1 as f64);
        match self {
            Self::Square { size } => ((a + 0.5) * size, (b + 0.5) * size),
            Self::Hex { radius } => (
                radius * 3f64.sqrt() * (a + b / 2.0),
                radius * 1.5 * b,
            ),
        }
    }
}

/// Rounds fractional axial coordinates to the nearest hex via cube coordinates.
fn hex_round(q: f64, r: f64) -> (i64, i64) {
    let s = -q - r;
    let (mut rq, mut rr, rs) = (q.round(), r.round(), s.round());
    let (dq, dr, ds) = ((rq - q).abs(), (rr - r).abs(), (rs - s).abs());
    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    (rq as i64, rr as i64)
}

/// Bins `(lon, lat, weight)` points. Non-finite weights are skipped.
///
/// Bins come back sorted by cell coordinates so output is deterministic.
pub fn aggregate(
    points: impl IntoIterator<Item = (f64, f64, f64)>,
    shape: BinShape,
    how: Aggregation,
) -> Vec<Bin> {
    let mut acc: HashMap<(i64, i64), (f64, usize)> = HashMap::new();
    for (x, y, w) in points {
        if !w.is_finite() || !x.is_finite() || !y.is_finite() {
            continue;
        }
        let slot = acc.entry(shape.cell_of(x, y)).or_insert((0.0, 0));
        slot.0 += w;
        slot.1 += 1;
    }

    let mut bins: Vec<Bin> = acc
        .into_iter()
        .map(|(cell, (sum, count))| Bin {
            cell,
            center: shape.center_of(cell),
            value: match how {
                Aggregation::Sum => sum,
                Aggregation::Mean => sum / count as f64,
            },
            count,
        })
        .collect();
    bins.sort_by_key(|b| b.cell);
    bins
}
