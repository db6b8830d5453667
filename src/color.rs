//! Color scales: continuous RdBu / RdPu interpolation and quantized palettes.
//!
//! The continuous scales pass a uniform cubic B-spline through the full
//! ColorBrewer scheme, one RGB channel at a time, the same construction web
//! map tooling uses for `interpolateRdBu` / `interpolateRdPu`.

use std::fmt;

use serde::Serialize;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Self = Self(0, 0, 0);
    pub const WHITE: Self = Self(255, 255, 255);

    /// Splits a `0xRRGGBB` literal into channels.
    const fn from_hex(hex: u32) -> Self {
        Self((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Blends toward black by `1 - opacity`.
    pub fn dimmed(self, opacity: f64) -> Self {
        let a = opacity.clamp(0.0, 1.0);
        let mix = |c: u8| (f64::from(c) * a).round() as u8;
        Self(mix(self.0), mix(self.1), mix(self.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Red to blue diverging scheme, 11 classes.
const RDBU: [Rgb; 11] = [
    Rgb::from_hex(0x67001f),
    Rgb::from_hex(0xb2182b),
    Rgb::from_hex(0xd6604d),
    Rgb::from_hex(0xf4a582),
    Rgb::from_hex(0xfddbc7),
    Rgb::from_hex(0xf7f7f7),
    Rgb::from_hex(0xd1e5f0),
    Rgb::from_hex(0x92c5de),
    Rgb::from_hex(0x4393c3),
    Rgb::from_hex(0x2166ac),
    Rgb::from_hex(0x053061),
];

/// Red to purple sequential scheme, 9 classes.
const RDPU: [Rgb; 9] = [
    Rgb::from_hex(0xfff7f3),
    Rgb::from_hex(0xfde0dd),
    Rgb::from_hex(0xfcc5c0),
    Rgb::from_hex(0xfa9fb5),
    Rgb::from_hex(0xf768a1),
    Rgb::from_hex(0xdd3497),
    Rgb::from_hex(0xae017e),
    Rgb::from_hex(0x7a0177),
    Rgb::from_hex(0x49006a),
];

/// Blue to red range used by the aggregation layers (low load is blue).
pub const LOAD_RANGE: [Rgb; 11] = [
    Rgb(5, 48, 97),
    Rgb(33, 102, 172),
    Rgb(67, 147, 195),
    Rgb(146, 197, 222),
    Rgb(209, 229, 240),
    Rgb(247, 247, 247),
    Rgb(253, 219, 199),
    Rgb(244, 165, 130),
    Rgb(214, 96, 77),
    Rgb(178, 24, 43),
    Rgb(103, 0, 31),
];

/// A continuous scale over `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScale {
    /// Diverging red (0) through white (0.5) to blue (1).
    RdBu,
    /// Sequential pale pink (0) to purple (1).
    RdPu,
}

impl ColorScale {
    fn scheme(self) -> &'static [Rgb] {
        match self {
            Self::RdBu => &RDBU,
            Self::RdPu => &RDPU,
        }
    }

    /// Samples the scale. `t` is clamped to `[0, 1]`; a non-finite `t` yields black.
    pub fn at(self, t: f64) -> Rgb {
        if !t.is_finite() {
            return Rgb::BLACK;
        }
        let scheme = self.scheme();
        Rgb(
            channel(scheme, t, |c| c.0),
            channel(scheme, t, |c| c.1),
            channel(scheme, t, |c| c.2),
        )
    }
}

/// Evaluates one channel of the B-spline through `scheme` at `t`.
fn channel(scheme: &[Rgb], t: f64, pick: impl Fn(&Rgb) -> u8) -> u8 {
    let values: Vec<f64> = scheme.iter().map(|c| f64::from(pick(c))).collect();
    let n = values.len() - 1;
    let (t, i) = if t <= 0.0 {
        (0.0, 0)
    } else if t >= 1.0 {
        (1.0, n - 1)
    } else {
        (t, (t * n as f64).floor() as usize)
    };
    let v1 = values[i];
    let v2 = values[i + 1];
    let v0 = if i > 0 { values[i - 1] } else { 2.0 * v1 - v2 };
    let v3 = if i < n - 1 {
        values[i + 2]
    } else {
        2.0 * v2 - v1
    };
    let local = (t - i as f64 / n as f64) * n as f64;
    basis(local, v0, v1, v2, v3).round().clamp(0.0, 255.0) as u8
}

/// Uniform cubic B-spline basis.
fn basis(t1: f64, v0: f64, v1: f64, v2: f64, v3: f64) -> f64 {
    let t2 = t1 * t1;
    let t3 = t2 * t1;
    ((1.0 - 3.0 * t1 + 3.0 * t2 - t3) * v0
        + (4.0 - 6.0 * t2 + 3.0 * t3) * v1
        + (1.0 + 3.0 * t1 + 3.0 * t2 - 3.0 * t3) * v2
        + t3 * v3)
        / 6.0
}

/// Maps a continuous domain onto a discrete palette by equal-width buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantize {
    domain: [f64; 2],
    range: Vec<Rgb>,
}

impl Quantize {
    pub fn new(domain: [f64; 2], range: Vec<Rgb>) -> Self {
        Self { domain, range }
    }

    /// The 102-step red-to-blue palette for bus voltage contours.
    ///
    /// Entry `i` is `RdBu(1 - i / 101)`, so low voltages map to blue and high
    /// voltages to red over `[0.975, 1.025]` p.u.
    pub fn voltage_contours() -> Self {
        let range = (0..102)
            .map(|i| ColorScale::RdBu.at(1.0 - f64::from(i) / 101.0))
            .collect();
        Self::new([0.975, 1.025], range)
    }

    /// The 11-color load range over `[lo, hi]`.
    pub fn load(lo: f64, hi: f64) -> Self {
        Self::new([lo, hi], LOAD_RANGE.to_vec())
    }

    /// Bucket index for `value`, clamped to the palette.
    pub fn index(&self, value: f64) -> usize {
        let last = self.range.len().saturating_sub(1);
        let [lo, hi] = self.domain;
        if !value.is_finite() || hi <= lo {
            return 0;
        }
        let t = (value - lo) / (hi - lo);
        ((t * self.range.len() as f64).floor().max(0.0) as usize).min(last)
    }

    pub fn color(&self, value: f64) -> Rgb {
        self.range
            .get(self.index(value))
            .copied()
            .unwrap_or(Rgb::BLACK)
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}
