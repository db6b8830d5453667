//! Color constants and conversions for the TUI.

use ratatui::style::Color;

use crate::color::Rgb;

/// Header bar foreground.
pub const HEADER_FG: Color = Color::White;
/// Header bar background.
pub const HEADER_BG: Color = Color::DarkGray;
/// Footer help text color.
pub const FOOTER_FG: Color = Color::DarkGray;
/// Visible layer entry.
pub const LAYER_ON: Color = Color::LightBlue;
/// Hidden layer entry.
pub const LAYER_OFF: Color = Color::DarkGray;
/// Lookup-miss counter when non-zero.
pub const MISS_WARN: Color = Color::Yellow;
/// Playing indicator.
pub const PLAYING: Color = Color::Green;
/// Inspect cursor and its status line.
pub const INSPECT: Color = Color::Cyan;

/// Lowest opacity used on a terminal; fainter layers would vanish into the background.
const MIN_TERMINAL_OPACITY: f64 = 0.35;

pub fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

/// Applies a layer's opacity, floored so faint layers stay visible.
pub fn layer_color(rgb: Rgb, opacity: f64) -> Color {
    to_color(rgb.dimmed(opacity.max(MIN_TERMINAL_OPACITY)))
}
