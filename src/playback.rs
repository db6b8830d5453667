//! Timestep playback: wraparound stepping, play/pause, speed, and the tick schedule.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::PlaybackConfig;

/// Fastest allowed playback rate (ticks per second).
pub const MAX_SPEED: f64 = 1024.0;

/// Slowest allowed playback rate (ticks per second).
pub const MIN_SPEED: f64 = 1.0;

/// Five-minute steps in one day.
pub const DAY_OF_FIVE_MINUTE_STEPS: usize = 288;

/// Hourly steps in one week.
pub const WEEK_OF_HOURLY_STEPS: usize = 168;

/// User-visible playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Current timestep, always in `[0, horizon)`.
    pub timestep: usize,
    /// Whether the recurring tick is running.
    pub animating: bool,
    /// Ticks per second.
    pub speed: f64,
}

/// Owns [`PlaybackState`] and the single pending tick deadline.
///
/// The tick schedule is driven by caller-supplied instants: the event loop
/// passes `Instant::now()`, tests pass synthetic instants. Any change to
/// `animating` or `speed` replaces the pending deadline, so at most one tick
/// is ever scheduled.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    state: PlaybackState,
    horizon: usize,
    initial_timestep: usize,
    next_tick: Option<Instant>,
}

impl PlaybackController {
    /// Creates a controller and schedules the first tick if `animate` is set.
    ///
    /// `horizon` must be non-zero; [`crate::config::DashboardConfig::validate`]
    /// enforces this for configured dashboards.
    pub fn new(cfg: &PlaybackConfig, now: Instant) -> Self {
        let horizon = cfg.horizon.max(1);
        let mut controller = Self {
            state: PlaybackState {
                timestep: cfg.initial_timestep % horizon,
                animating: cfg.animate,
                speed: clamp_speed(cfg.speed),
            },
            horizon,
            initial_timestep: cfg.initial_timestep % horizon,
            next_tick: None,
        };
        controller.reschedule(now);
        controller
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn timestep(&self) -> usize {
        self.state.timestep
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn is_animating(&self) -> bool {
        self.state.animating
    }

    pub fn speed(&self) -> f64 {
        self.state.speed
    }

    /// Moves `delta` steps, wrapping in both directions.
    pub fn step(&mut self, delta: i64) {
        let horizon = self.horizon as i64;
        let next = (self.state.timestep as i64 + delta).rem_euclid(horizon);
        self.state.timestep = next as usize;
    }

    /// Starts or stops the recurring tick.
    pub fn toggle_animate(&mut self, now: Instant) {
        self.state.animating = !self.state.animating;
        debug!(animating = self.state.animating, "playback toggled");
        self.reschedule(now);
    }

    /// Sets the tick rate, clamped to `[MIN_SPEED, MAX_SPEED]`.
    pub fn set_speed(&mut self, multiplier: f64, now: Instant) {
        let speed = clamp_speed(multiplier);
        if speed != self.state.speed {
            self.state.speed = speed;
            debug!(speed, "playback speed changed");
            self.reschedule(now);
        }
    }

    /// Doubles the tick rate.
    pub fn speed_up(&mut self, now: Instant) {
        self.set_speed(self.state.speed * 2.0, now);
    }

    /// Halves the tick rate, never below [`MIN_SPEED`].
    pub fn speed_down(&mut self, now: Instant) {
        self.set_speed(self.state.speed / 2.0, now);
    }

    /// Returns to the configured initial timestep without touching speed or animation.
    pub fn reset(&mut self) {
        self.state.timestep = self.initial_timestep;
    }

    /// Time between ticks at the current speed (`1000 / speed` ms).
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.state.speed)
    }

    /// The pending tick deadline, if playback is running.
    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    /// How long the event loop may sleep before the next tick is due.
    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.next_tick.map(|at| at.saturating_duration_since(now))
    }

    /// Fires the pending tick if it is due.
    ///
    /// Advances one step, schedules the following tick one interval after
    /// `now`, and returns `true`. Returns `false` when paused or not yet due.
    pub fn poll_tick(&mut self, now: Instant) -> bool {
        match self.next_tick {
            Some(at) if now >= at => {
                self.step(1);
                self.next_tick = Some(now + self.tick_interval());
                true
            }
            _ => false,
        }
    }

    /// Cancels the pending tick and, when animating, schedules a fresh one.
    fn reschedule(&mut self, now: Instant) {
        self.next_tick = self
            .state
            .animating
            .then(|| now + self.tick_interval());
    }
}

/// Clamps a rate into `[MIN_SPEED, MAX_SPEED]`; NaN becomes the minimum.
fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        MIN_SPEED
    } else {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    }
}

/// Day-of-week (1-7) and hour-of-day (0-23) for an hourly timestep.
pub fn day_and_hour(timestep: usize) -> (usize, usize) {
    ((timestep / 24) % 7 + 1, timestep % 24)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(horizon: usize, animate: bool, speed: f64) -> (PlaybackController, Instant) {
        let now = Instant::now();
        let cfg = PlaybackConfig {
            horizon,
            initial_timestep: 0,
            animate,
            speed,
        };
        (PlaybackController::new(&cfg, now), now)
    }

    #[test]
    fn step_wraps_modulo_horizon() {
        let (mut pb, _) = controller(DAY_OF_FIVE_MINUTE_STEPS, false, 1.0);
        for delta in [-1000_i64, -289, -288, -1, 0, 1, 7, 287, 288, 1000] {
            let prev = pb.timestep() as i64;
            pb.step(delta);
            let expected = (prev + delta).rem_euclid(288) as usize;
            assert_eq!(pb.timestep(), expected, "delta {delta}");
            assert!(pb.timestep() < 288);
        }
    }

    #[test]
    fn step_forward_at_last_timestep_wraps_to_zero() {
        let (mut pb, _) = controller(WEEK_OF_HOURLY_STEPS, false, 1.0);
        pb.step(167);
        assert_eq!(pb.timestep(), 167);
        pb.step(1);
        assert_eq!(pb.timestep(), 0);
    }

    #[test]
    fn step_back_from_zero_wraps_to_end() {
        let (mut pb, _) = controller(DAY_OF_FIVE_MINUTE_STEPS, false, 1.0);
        pb.step(-1);
        assert_eq!(pb.timestep(), 287);
    }

    #[test]
    fn paused_controller_never_ticks() {
        let (mut pb, now) = controller(288, false, 1.0);
        assert!(pb.next_tick().is_none());
        assert!(!pb.poll_tick(now + Duration::from_secs(60)));
        assert_eq!(pb.timestep(), 0);
    }

    #[test]
    fn tick_fires_after_interval() {
        let (mut pb, now) = controller(288, true, 4.0);
        assert_eq!(pb.tick_interval(), Duration::from_millis(250));
        assert!(!pb.poll_tick(now + Duration::from_millis(100)));
        assert!(pb.poll_tick(now + Duration::from_millis(250)));
        assert_eq!(pb.timestep(), 1);
        // next tick is one interval after the one that fired
        assert_eq!(
            pb.next_tick(),
            Some(now + Duration::from_millis(500))
        );
    }

    #[test]
    fn toggling_off_cancels_pending_tick() {
        let (mut pb, now) = controller(288, true, 1.0);
        assert!(pb.next_tick().is_some());
        pb.toggle_animate(now);
        assert!(pb.next_tick().is_none());
        for secs in [1, 2, 10, 3600] {
            assert!(!pb.poll_tick(now + Duration::from_secs(secs)));
        }
        assert_eq!(pb.timestep(), 0);
    }

    #[test]
    fn speed_change_replaces_pending_tick() {
        let (mut pb, now) = controller(288, true, 1.0);
        let later = now + Duration::from_millis(300);
        pb.speed_up(later);
        assert_eq!(pb.next_tick(), Some(later + Duration::from_millis(500)));
        // the original one-second deadline is gone
        assert!(!pb.poll_tick(now + Duration::from_millis(700)));
        assert!(pb.poll_tick(later + Duration::from_millis(500)));
        assert_eq!(pb.timestep(), 1);
    }

    #[test]
    fn halving_never_goes_below_one() {
        let (mut pb, now) = controller(168, false, 16.0);
        let mut seen = Vec::new();
        for _ in 0..10 {
            pb.speed_down(now);
            seen.push(pb.speed());
        }
        assert_eq!(&seen[..5], &[8.0, 4.0, 2.0, 1.0, 1.0]);
        assert!(seen.iter().all(|&s| s >= MIN_SPEED));
    }

    #[test]
    fn halving_odd_speed_stops_at_one() {
        let (mut pb, now) = controller(168, false, 3.0);
        pb.speed_down(now);
        assert_eq!(pb.speed(), 1.5);
        pb.speed_down(now);
        assert_eq!(pb.speed(), 1.0);
    }

    #[test]
    fn doubling_is_capped() {
        let (mut pb, now) = controller(168, false, 1.0);
        for _ in 0..20 {
            pb.speed_up(now);
        }
        assert_eq!(pb.speed(), MAX_SPEED);
    }

    #[test]
    fn nan_speed_from_config_falls_back_to_minimum() {
        let (pb, now) = controller(168, true, f64::NAN);
        assert_eq!(pb.speed(), MIN_SPEED);
        assert_eq!(pb.tick_interval(), Duration::from_secs(1));
        assert_eq!(pb.next_tick(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn reset_returns_to_initial_timestep() {
        let now = Instant::now();
        let cfg = PlaybackConfig {
            horizon: 168,
            initial_timestep: 24,
            animate: true,
            speed: 16.0,
        };
        let mut pb = PlaybackController::new(&cfg, now);
        pb.step(30);
        assert_eq!(pb.timestep(), 54);
        pb.reset();
        assert_eq!(pb.timestep(), 24);
        assert!(pb.is_animating());
    }

    #[test]
    fn day_and_hour_labels() {
        assert_eq!(day_and_hour(0), (1, 0));
        assert_eq!(day_and_hour(24), (2, 0));
        assert_eq!(day_and_hour(47), (2, 23));
        assert_eq!(day_and_hour(167), (7, 23));
        assert_eq!(day_and_hour(168), (1, 0));
    }
}
