//! Terminal dashboards for time-stepped electrical-grid simulation outputs.

pub mod cli;
pub mod color;
pub mod config;
pub mod dashboard;
/// Data sources, parsing, and per-timestep lookup tables.
pub mod data;
pub mod error;
pub mod io;
/// Layer catalog, styling functions, and spatial aggregation.
pub mod layers;
/// Timestep playback and its tick schedule.
pub mod playback;
pub mod scene;
#[cfg(feature = "tui")]
pub mod tui;
pub mod viewport;
