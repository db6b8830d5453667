//! Live terminal UI for the dashboards.
//!
//! Feature-gated behind `tui` (on by default). Run without `--headless`.

mod controls;
mod layout;
/// Application state and transitions.
pub mod runtime;
mod style;

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use tracing::info;

use crate::dashboard::Dashboard;
use runtime::App;

/// Upper bound on how long the loop sleeps while paused, so resizes redraw promptly.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Runs the dashboard until the user quits.
///
/// Sets up the terminal (raw mode, alternate screen), runs the event loop,
/// and restores the terminal on exit, including when the loop fails.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up or drawn to.
pub fn run(dashboard: Dashboard) -> io::Result<()> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e);
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(t) => t,
        Err(e) => {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            return Err(e);
        }
    };

    let mut app = App::new(dashboard, Instant::now());
    let result = event_loop(&mut terminal, &mut app);

    // Teardown: always restore terminal state
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    info!(timestep = app.playback.timestep(), "dashboard closed");
    result
}

/// Core event loop: draw, wait for input or the next tick deadline, advance.
fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        let size = terminal.size()?;
        app.map_aspect = layout::map_aspect(Rect::new(0, 0, size.width, size.height));

        terminal.draw(|frame| layout::render(frame, app))?;

        if app.quit {
            return Ok(());
        }

        let now = Instant::now();
        let poll_timeout = app
            .playback
            .time_until_tick(now)
            .map_or(IDLE_POLL, |d| d.min(IDLE_POLL));

        if event::poll(poll_timeout)? {
            if let Event::Key(key) = event::read()? {
                controls::handle_key(app, key, Instant::now());
            }
        }

        app.tick(Instant::now());
    }
}
