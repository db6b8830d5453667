//! TUI application state and the named transitions that change it.

use std::time::Instant;

use tracing::{debug, info};

use crate::dashboard::Dashboard;
use crate::data::Position;
use crate::layers::{self, LayerId, LayerSet};
use crate::playback::PlaybackController;
use crate::scene::{Glyph, Scene};
use crate::viewport::Viewport;

/// The glyph under the inspect cursor, matched again after each scene rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspected {
    pub layer: LayerId,
    pub entity: Option<String>,
    pub at: Position,
}

impl Inspected {
    fn of(glyph: &Glyph, at: Position) -> Self {
        Self {
            layer: glyph.layer,
            entity: glyph.entity.clone(),
            at,
        }
    }
}

/// TUI application state.
pub struct App {
    dashboard: Dashboard,
    /// Timestep, animation flag, speed, and the single pending tick.
    pub playback: PlaybackController,
    /// Layer toggles.
    pub layers: LayerSet,
    pub viewport: Viewport,
    /// Scene for the current timestep and layers.
    pub scene: Scene,
    /// Width / height of the map area in display units, updated on resize.
    pub map_aspect: f64,
    /// Last user-facing message for the status line.
    pub message: Option<String>,
    pub inspected: Option<Inspected>,
    /// Whether the user has requested quit.
    pub quit: bool,
}

impl App {
    pub fn new(dashboard: Dashboard, now: Instant) -> Self {
        let playback = PlaybackController::new(&dashboard.config().playback, now);
        let layers = dashboard.initial_layers();
        let viewport = Viewport::new(&dashboard.config().view);
        let scene = dashboard.scene(playback.timestep(), &layers);
        Self {
            dashboard,
            playback,
            layers,
            viewport,
            scene,
            map_aspect: 2.0,
            message: None,
            inspected: None,
            quit: false,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Fires the pending tick if it is due. Returns `true` if the timestep advanced.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.playback.poll_tick(now) {
            return false;
        }
        self.refresh();
        true
    }

    pub fn toggle_animate(&mut self, now: Instant) {
        self.playback.toggle_animate(now);
        info!(
            animating = self.playback.is_animating(),
            timestep = self.playback.timestep(),
            "playback toggled"
        );
    }

    pub fn step(&mut self, delta: i64) {
        self.playback.step(delta);
        self.refresh();
    }

    pub fn speed_up(&mut self, now: Instant) {
        self.playback.speed_up(now);
        debug!(speed = self.playback.speed(), "speed changed");
    }

    pub fn speed_down(&mut self, now: Instant) {
        self.playback.speed_down(now);
        debug!(speed = self.playback.speed(), "speed changed");
    }

    /// Returns to the configured initial timestep.
    pub fn reset(&mut self) {
        self.playback.reset();
        self.refresh();
        self.message = Some(format!("reset to t={}", self.playback.timestep()));
    }

    /// Flips the layer bound to `hotkey`. Returns `false` if no layer has that key.
    pub fn toggle_layer(&mut self, hotkey: char) -> bool {
        let Some(visible) = self.layers.toggle_hotkey(hotkey) else {
            return false;
        };
        if let Some(spec) = layers::catalog(self.layers.kind())
            .iter()
            .find(|s| s.hotkey == hotkey)
        {
            let state = if visible { "on" } else { "off" };
            self.message = Some(format!("{} {state}", spec.label.trim_end_matches('*')));
        }
        self.refresh();
        true
    }

    /// Centers the view on the loaded features.
    pub fn fit(&mut self) {
        if let Some(bbox) = self.dashboard.data().bounds() {
            self.viewport.fit(bbox, self.map_aspect);
        }
    }

    /// Moves the inspect cursor one glyph outward from the map center.
    pub fn inspect_next(&mut self) {
        self.inspect_cycle(1);
    }

    /// Moves the inspect cursor one glyph back toward the map center.
    pub fn inspect_prev(&mut self) {
        self.inspect_cycle(-1);
    }

    fn inspect_cycle(&mut self, delta: isize) {
        let center = (self.viewport.longitude, self.viewport.latitude);
        let mut candidates: Vec<(f64, Position, &Glyph)> = self
            .scene
            .glyphs
            .iter()
            .filter_map(|g| g.anchor().map(|at| (ground_distance(center, at), at, g)))
            .collect();
        if candidates.is_empty() {
            self.inspected = None;
            self.message = Some("nothing to inspect".into());
            return;
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = candidates.len() as isize;
        let current = self
            .inspected_glyph()
            .and_then(|cur| candidates.iter().position(|(_, _, g)| std::ptr::eq(*g, cur)));
        let next = match current {
            Some(i) => (i as isize + delta).rem_euclid(n),
            None if delta < 0 => n - 1,
            None => 0,
        };
        let (_, at, glyph) = candidates[next as usize];
        let picked = Inspected::of(glyph, at);
        self.inspected = Some(picked);
    }

    /// Puts the inspect cursor on the glyph anchored closest to `at`.
    ///
    /// Among glyphs at the same spot the one drawn last, on top, wins.
    /// Returns `false` if nothing visible has a position.
    pub fn inspect_nearest(&mut self, at: Position) -> bool {
        let mut best: Option<(f64, Position, &Glyph)> = None;
        for g in self.scene.glyphs.iter().rev() {
            let Some(anchor) = g.anchor() else {
                continue;
            };
            let d = ground_distance(at, anchor);
            if best.is_none_or(|(bd, _, _)| d < bd) {
                best = Some((d, anchor, g));
            }
        }
        self.inspected = best.map(|(_, anchor, g)| Inspected::of(g, anchor));
        self.inspected.is_some()
    }

    /// Inspects whatever sits under the map center.
    pub fn inspect_center(&mut self) {
        let center = (self.viewport.longitude, self.viewport.latitude);
        if !self.inspect_nearest(center) {
            self.message = Some("nothing to inspect".into());
        }
    }

    pub fn clear_inspect(&mut self) {
        self.inspected = None;
    }

    /// The inspected glyph in the current scene, if its layer is still drawn.
    pub fn inspected_glyph(&self) -> Option<&Glyph> {
        let sel = self.inspected.as_ref()?;
        let matches: Vec<&Glyph> = self
            .scene
            .layer(sel.layer)
            .filter(|g| g.entity == sel.entity)
            .collect();
        matches
            .iter()
            .find(|g| g.anchor() == Some(sel.at))
            .or_else(|| matches.first().filter(|_| sel.entity.is_some()))
            .copied()
    }

    /// Layer, entity and encoded attributes of the inspected glyph.
    pub fn inspect_text(&self) -> Option<String> {
        let g = self.inspected_glyph()?;
        let label = layers::spec_for(self.layers.kind(), g.layer)
            .map_or(g.layer.key(), |s| s.label)
            .trim_end_matches('*');
        let value = g.value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
        let size = g.size().map_or_else(|| "-".to_string(), |s| format!("{s:.2}"));
        Some(format!(
            "{label} {} value={value} color={} size={size}",
            g.entity.as_deref().unwrap_or("-"),
            g.color,
        ))
    }

    /// Clock text for the header.
    pub fn clock_label(&self) -> String {
        self.dashboard.clock_label(self.playback.timestep())
    }

    pub fn headline(&self) -> String {
        self.dashboard.headline(self.playback.timestep())
    }

    /// Rebuilds the scene after the timestep or the layer set changed.
    fn refresh(&mut self) {
        self.scene = self
            .dashboard
            .scene(self.playback.timestep(), &self.layers);
    }
}

/// Planar distance in degrees with longitude shrunk by the cosine of latitude.
fn ground_distance(a: Position, b: Position) -> f64 {
    let k = a.1.to_radians().cos();
    ((a.0 - b.0) * k).hypot(a.1 - b.1)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::config::DashboardConfig;
    use crate::layers::styling;
    use crate::tui::{controls, layout};
    use crate::data::features::parse_features;
    use crate::data::{DashboardData, Feature, VoltageData, VoltageTable};

    fn buses() -> Vec<Feature> {
        parse_features(
            r#"[{"geometry": {"type": "Point", "coordinates": [-122.24, 37.81]}, "properties": {"bus": "a"}},
                {"geometry": {"type": "Point", "coordinates": [-122.20, 37.85]}, "properties": {"bus": "b"}}]"#,
            "buses",
        )
        .expect("buses")
    }

    fn app(now: Instant) -> App {
        let mut config = DashboardConfig::voltage();
        config.playback.horizon = 4;
        let rows = (0..4).map(|t| vec![1.0 + f64::from(t) * 0.01, 0.99]).collect();
        let data = VoltageData {
            voltages: VoltageTable::from_parts(vec!["a".into(), "b".into()], rows),
            buses: buses(),
            ..VoltageData::default()
        };
        App::new(
            Dashboard::new(config, DashboardData::Voltage(data)),
            now,
        )
    }

    #[test]
    fn app_starts_paused_at_initial_timestep() {
        let app = app(Instant::now());
        assert_eq!(app.playback.timestep(), 0);
        assert!(!app.playback.is_animating());
        assert!(!app.quit);
    }

    #[test]
    fn tick_only_advances_while_animating() {
        let now = Instant::now();
        let mut app = app(now);
        assert!(!app.tick(now + Duration::from_secs(5)));

        app.toggle_animate(now);
        let due = app.playback.next_tick().expect("tick scheduled");
        assert!(app.tick(due));
        assert_eq!(app.playback.timestep(), 1);
        assert_eq!(app.scene.timestep, 1);
    }

    #[test]
    fn step_wraps_and_rebuilds_scene() {
        let mut app = app(Instant::now());
        app.layers.toggle(LayerId::VoltageGlyphs);
        app.step(-1);
        assert_eq!(app.playback.timestep(), 3);
        let a = app
            .scene
            .layer(LayerId::VoltageGlyphs)
            .find(|g| g.entity.as_deref() == Some("a"))
            .expect("glyph for bus a");
        assert!((a.value.expect("voltage") - 1.03).abs() < 1e-9);
    }

    #[test]
    fn toggle_layer_by_hotkey() {
        let mut app = app(Instant::now());
        assert_eq!(app.scene.layer(LayerId::VoltageGlyphs).count(), 0);
        assert!(app.toggle_layer('g'));
        assert_eq!(app.scene.layer(LayerId::VoltageGlyphs).count(), 2);
        assert_eq!(app.message.as_deref(), Some("Glyphs on"));
        assert!(!app.toggle_layer('z'));
    }

    #[test]
    fn speed_controls_stay_in_bounds() {
        let now = Instant::now();
        let mut app = app(now);
        for _ in 0..20 {
            app.speed_down(now);
        }
        assert_eq!(app.playback.speed(), 1.0);
        for _ in 0..20 {
            app.speed_up(now);
        }
        assert_eq!(app.playback.speed(), 1024.0);
    }

    #[test]
    fn reset_returns_to_initial_timestep() {
        let mut app = app(Instant::now());
        app.step(2);
        app.reset();
        assert_eq!(app.playback.timestep(), 0);
        assert!(app.message.is_some());
    }

    #[test]
    fn fit_centers_on_features() {
        let mut app = app(Instant::now());
        app.fit();
        assert!((app.viewport.longitude - (-122.22)).abs() < 1e-9);
        assert!((app.viewport.latitude - 37.83).abs() < 1e-9);
    }

    #[test]
    fn inspected_bus_shows_in_the_status_panel() {
        let mut app = app(Instant::now());
        app.toggle_layer('b');
        app.toggle_layer('g');
        app.step(1);
        assert!(app.inspect_nearest((-122.239, 37.811)));

        let expected = format!(
            "Glyphs a value=1.0100 color={} size=4.00",
            styling::voltage_color(1.01)
        );
        assert_eq!(app.inspect_text().as_deref(), Some(expected.as_str()));

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).expect("terminal");
        terminal
            .draw(|frame| layout::render(frame, &app))
            .expect("draw");
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains(&expected), "status panel lacks {expected}");
    }

    #[test]
    fn inspection_follows_the_timestep() {
        let mut app = app(Instant::now());
        app.toggle_layer('g');
        app.toggle_layer('b');
        assert!(app.inspect_nearest((-122.24, 37.81)));
        app.step(2);
        let g = app.inspected_glyph().expect("glyph survives the rebuild");
        assert_eq!(g.value, Some(1.02));

        app.toggle_layer('g');
        assert!(app.inspected_glyph().is_none());
        assert!(app.inspect_text().is_none());
    }

    #[test]
    fn topmost_glyph_wins_a_tie() {
        let mut app = app(Instant::now());
        app.toggle_layer('g');
        assert!(app.inspect_nearest((-122.24, 37.81)));
        assert_eq!(app.inspected_glyph().map(|g| g.layer), Some(LayerId::Buses));
    }

    #[test]
    fn tab_cycles_outward_from_the_map_center() {
        let now = Instant::now();
        let mut app = app(now);
        app.viewport.longitude = -122.20;
        app.viewport.latitude = 37.85;
        let press = |app: &mut App, code| controls::handle_key(app, KeyEvent::new(code, KeyModifiers::NONE), now);
        let entity = |app: &App| app.inspected_glyph().and_then(|g| g.entity.clone());

        press(&mut app, KeyCode::Tab);
        assert_eq!(entity(&app).as_deref(), Some("b"));
        assert_eq!(
            app.inspect_text().as_deref(),
            Some("Buses b value=- color=rgb(255, 255, 255) size=4.00")
        );
        press(&mut app, KeyCode::Tab);
        assert_eq!(entity(&app).as_deref(), Some("a"));
        press(&mut app, KeyCode::Tab);
        assert_eq!(entity(&app).as_deref(), Some("b"));
        press(&mut app, KeyCode::BackTab);
        assert_eq!(entity(&app).as_deref(), Some("a"));
        press(&mut app, KeyCode::Backspace);
        assert!(app.inspected.is_none());

        press(&mut app, KeyCode::Enter);
        assert_eq!(entity(&app).as_deref(), Some("b"));
    }

    #[test]
    fn inspecting_an_empty_map_says_so() {
        let mut app = app(Instant::now());
        app.toggle_layer('b');
        app.inspect_next();
        assert!(app.inspected.is_none());
        assert_eq!(app.message.as_deref(), Some("nothing to inspect"));
    }
}
