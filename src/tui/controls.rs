//! Keyboard input handling for the TUI.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::runtime::App;

/// Maps a key event to an application action.
///
/// Guards on [`KeyEventKind::Press`] to avoid double-fire on some terminals.
/// Lowercase letters not bound below toggle the layer with that hotkey.
pub fn handle_key(app: &mut App, key: KeyEvent, now: Instant) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit = true,
        KeyCode::Char(' ') => app.toggle_animate(now),
        KeyCode::Char('.') | KeyCode::Right => app.step(1),
        KeyCode::Char(',') | KeyCode::Left => app.step(-1),
        KeyCode::Char('+' | '=') | KeyCode::Up => app.speed_up(now),
        KeyCode::Char('-') | KeyCode::Down => app.speed_down(now),
        KeyCode::Char('r') => app.reset(),
        KeyCode::Char(']') => app.viewport.zoom_in(),
        KeyCode::Char('[') => app.viewport.zoom_out(),
        KeyCode::Char('f') => app.fit(),
        KeyCode::Tab => app.inspect_next(),
        KeyCode::BackTab => app.inspect_prev(),
        KeyCode::Enter => app.inspect_center(),
        KeyCode::Backspace => app.clear_inspect(),
        KeyCode::Char('W') => app.viewport.pan(0, 1),
        KeyCode::Char('S') => app.viewport.pan(0, -1),
        KeyCode::Char('A') => app.viewport.pan(-1, 0),
        KeyCode::Char('D') => app.viewport.pan(1, 0),
        KeyCode::Char(c) if c.is_ascii_lowercase() => {
            app.toggle_layer(c);
        }
        _ => {}
    }
}
