//! The perception-driven synchronization engine.
//!
//! A bounded-wait state machine that walks the target application from
//! process launch to its main menu using only template matches on captured
//! frames. Every wait is a synchronous poll-sleep loop with a wall-clock
//! deadline measured from state entry; the deadline is checked at the top of
//! each iteration, so overrun is bounded by one poll interval.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::{Config, LoginStrategy};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::matcher::{BestScore, Matcher, Template};
use crate::platform::{Desktop, Point};
use crate::state::{RunOutcome, State};
use crate::supervisor::ProcessControl;

/// Mean-intensity ceiling for the "mostly black" readiness heuristic.
const BLACK_MEAN_THRESHOLD: f64 = 1.0;
/// Non-zero pixel fraction floor for the "mostly black" readiness heuristic.
const BLACK_NONZERO_RATIO: f64 = 0.01;
/// Interval between process-presence checks while waiting for boot.
const BOOT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Which marker template a wait is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Login,
    LoginUi,
    Connecting,
    MainMenu,
}

/// The four marker templates, loaded once and shared read-only.
#[derive(Debug, Clone)]
pub struct Markers {
    pub login: Template,
    pub login_ui: Template,
    pub connecting: Template,
    pub main_menu: Template,
}

impl Markers {
    /// Load all marker templates from the configured asset paths.
    pub fn load(config: &Config) -> Result<Self> {
        let paths = &config.templates;
        Ok(Self {
            login: Template::load(&paths.login_marker)?,
            login_ui: Template::load(&paths.login_ui_marker)?,
            connecting: Template::load(&paths.connecting_marker)?,
            main_menu: Template::load(&paths.main_menu_marker)?,
        })
    }

    fn get(&self, marker: Marker) -> &Template {
        match marker {
            Marker::Login => &self.login,
            Marker::LoginUi => &self.login_ui,
            Marker::Connecting => &self.connecting,
            Marker::MainMenu => &self.main_menu,
        }
    }
}

/// Enforces the minimum interval between injected clicks.
#[derive(Debug, Clone)]
pub struct ClickGate {
    cooldown: Duration,
    last_click: Option<Instant>,
}

impl ClickGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_click: None,
        }
    }

    /// Returns `true` when a click may be injected now.
    pub fn ready(&self) -> bool {
        self.last_click
            .map_or(true, |last| last.elapsed() >= self.cooldown)
    }

    /// Record that a click was just injected.
    pub fn fire(&mut self) {
        self.last_click = Some(Instant::now());
    }
}

/// Result of one state's action: advance, or end the run.
enum Transition {
    To(State),
    Done(RunOutcome),
}

/// The synchronization engine.
///
/// Owns all mutable run state (current state, best-score trackers, cooldown
/// timestamp) on a single logical thread.
pub struct Engine<D: Desktop, P: ProcessControl> {
    config: Config,
    desktop: D,
    supervisor: P,
    matcher: Matcher,
    markers: Markers,
    diagnostics: Diagnostics,
    click_gate: ClickGate,
    /// Location of the last matched login marker, frame-relative
    last_marker_location: Option<Point>,
}

impl<D: Desktop, P: ProcessControl> Engine<D, P> {
    /// Build an engine, loading marker templates from the configured paths.
    pub fn new(config: Config, desktop: D, supervisor: P) -> Result<Self> {
        let markers = Markers::load(&config)?;
        Ok(Self::with_markers(config, desktop, supervisor, markers))
    }

    /// Build an engine with pre-loaded marker templates.
    pub fn with_markers(config: Config, desktop: D, supervisor: P, markers: Markers) -> Self {
        let matcher = Matcher::new(config.match_threshold);
        let diagnostics = Diagnostics::new(&config.diagnostics_dir);
        let click_gate = ClickGate::new(config.click_cooldown());
        Self {
            config,
            desktop,
            supervisor,
            matcher,
            markers,
            diagnostics,
            click_gate,
            last_marker_location: None,
        }
    }

    /// Drive the state machine to a terminal state.
    ///
    /// Never panics on collaborator failures: any error escaping a poll is
    /// funneled into the Fail path with its description as the reason.
    pub fn run(&mut self) -> RunOutcome {
        let mut state = State::Start;
        info!("entering state {}", state);
        loop {
            if state == State::Ok {
                info!("run complete: main menu reached");
                return RunOutcome::ok("main menu reached");
            }
            match self.step(state) {
                Ok(Transition::To(next)) => {
                    info!("transition {} -> {}", state, next);
                    state = next;
                    if self.config.debug_snapshots {
                        self.debug_snapshot(state);
                    }
                }
                Ok(Transition::Done(outcome)) => return outcome,
                Err(e) => return self.fail(state, format!("unexpected fault: {}", e)),
            }
        }
    }

    fn step(&mut self, state: State) -> Result<Transition> {
        match state {
            State::Start => self.step_start(),
            State::WaitLogin => match self.config.login_strategy {
                LoginStrategy::WaitThenClick => self.step_wait_login_simple(),
                LoginStrategy::CooldownPolling => self.step_wait_login_polling(),
            },
            State::ClickLogin => self.step_click_login(),
            State::WaitMainMenu => self.step_wait_main_menu(),
            // Terminal states are handled by the run loop / fail funnel
            State::Ok | State::Fail => unreachable!("terminal state stepped"),
        }
    }

    /// Start: ensure the process is running and the window is usable.
    fn step_start(&mut self) -> Result<Transition> {
        if !self.supervisor.is_running() {
            info!("target process not detected, launching");
            if !self.supervisor.launch() {
                return Ok(Transition::Done(self.fail(
                    State::Start,
                    "target process not found and launch failed".to_string(),
                )));
            }
            if !self.wait_until_running(self.config.boot_timeout()) {
                return Ok(Transition::Done(self.fail(
                    State::Start,
                    "target process did not appear within the boot timeout".to_string(),
                )));
            }
        }
        if !self.wait_ready() {
            return Ok(Transition::Done(self.fail(
                State::Start,
                "target window never became focusable or visually ready".to_string(),
            )));
        }
        Ok(Transition::To(State::WaitLogin))
    }

    /// WaitLogin, simple variant: wait for the login marker, then click it.
    fn step_wait_login_simple(&mut self) -> Result<Transition> {
        let timeout = self.config.timeouts.for_state(State::WaitLogin);
        let (location, best) = self.wait_for_marker(Marker::Login, timeout, State::WaitLogin)?;
        match location {
            Some(point) => {
                self.last_marker_location = Some(point);
                Ok(Transition::To(State::ClickLogin))
            }
            None => Ok(Transition::Done(self.fail(
                State::WaitLogin,
                format!("login marker not detected, best score {:.4}", best),
            ))),
        }
    }

    /// WaitLogin, cooldown-polling variant: watch the connecting and
    /// main-menu markers while periodically clicking a safe point. Skips
    /// ClickLogin entirely when a later marker appears first.
    fn step_wait_login_polling(&mut self) -> Result<Transition> {
        let timeout = self.config.timeouts.for_state(State::WaitLogin);
        let start = Instant::now();
        let mut best = BestScore::new();

        while start.elapsed() <= timeout {
            let frame = self.desktop.capture(&self.config.window_title)?;
            let connecting = self.matcher.find(&frame, self.markers.get(Marker::Connecting));
            let main_menu = self.matcher.find(&frame, self.markers.get(Marker::MainMenu));
            let login_ui = self.matcher.find(&frame, self.markers.get(Marker::LoginUi));

            let poll_best = connecting.score.max(main_menu.score).max(login_ui.score);
            if best.observe(poll_best) {
                debug!("[{}] best score so far {:.4}", State::WaitLogin, best.get());
            }

            if main_menu.matched {
                info!(
                    "[{}] main-menu marker already visible, score {:.4}",
                    State::WaitLogin,
                    main_menu.score
                );
                return Ok(Transition::To(State::Ok));
            }
            if connecting.matched {
                info!(
                    "[{}] connecting marker visible, score {:.4}",
                    State::WaitLogin,
                    connecting.score
                );
                return Ok(Transition::To(State::WaitMainMenu));
            }

            if self.click_gate.ready() {
                if let Some(point) = self.safe_click_point() {
                    self.desktop.click(point)?;
                    self.click_gate.fire();
                    debug!("[{}] safe click at {}", State::WaitLogin, point);
                }
            }

            thread::sleep(self.config.poll_interval());
        }

        Ok(Transition::Done(self.fail(
            State::WaitLogin,
            format!(
                "no transition marker after login polling, best score {:.4}",
                best.get()
            ),
        )))
    }

    /// ClickLogin: click the stored marker location (or a fallback point),
    /// then wait for the connecting marker.
    fn step_click_login(&mut self) -> Result<Transition> {
        let point = match self.last_marker_location {
            Some(frame_point) => {
                info!("clicking login marker at {}", frame_point);
                self.frame_to_screen(frame_point)
            }
            None => {
                warn!("no stored marker location, falling back to safe point");
                match self.safe_click_point() {
                    Some(point) => point,
                    None => self.frame_center()?,
                }
            }
        };
        self.desktop.click(point)?;
        self.click_gate.fire();

        let timeout = self.config.timeouts.for_state(State::ClickLogin);
        let (location, best) =
            self.wait_for_marker(Marker::Connecting, timeout, State::ClickLogin)?;
        match location {
            Some(_) => Ok(Transition::To(State::WaitMainMenu)),
            None => Ok(Transition::Done(self.fail(
                State::ClickLogin,
                format!(
                    "no connecting transition after login click, best score {:.4}",
                    best
                ),
            ))),
        }
    }

    /// WaitMainMenu: wait for the main-menu marker.
    fn step_wait_main_menu(&mut self) -> Result<Transition> {
        let timeout = self.config.timeouts.for_state(State::WaitMainMenu);
        let (location, best) =
            self.wait_for_marker(Marker::MainMenu, timeout, State::WaitMainMenu)?;
        match location {
            Some(_) => Ok(Transition::To(State::Ok)),
            None => Ok(Transition::Done(self.fail(
                State::WaitMainMenu,
                format!("main-menu marker not detected, best score {:.4}", best),
            ))),
        }
    }

    /// Poll until `marker` matches or `timeout` elapses.
    ///
    /// Returns the matched location (frame-relative) and the best score
    /// observed across the entire wait, whether or not a match occurred.
    fn wait_for_marker(
        &mut self,
        marker: Marker,
        timeout: Duration,
        state: State,
    ) -> Result<(Option<Point>, f32)> {
        let start = Instant::now();
        let mut best = BestScore::new();
        while start.elapsed() <= timeout {
            let frame = self.desktop.capture(&self.config.window_title)?;
            let result = self.matcher.find(&frame, self.markers.get(marker));
            if best.observe(result.score) {
                debug!("[{}] best score so far {:.4}", state, best.get());
            }
            if result.matched {
                info!(
                    "[{}] marker {} found at {:?}, score {:.4}",
                    state,
                    self.markers.get(marker).name(),
                    result.location,
                    result.score
                );
                return Ok((result.location, best.get()));
            }
            thread::sleep(self.config.poll_interval());
        }
        warn!(
            "[{}] timed out waiting for marker {}, best score {:.4}",
            state,
            self.markers.get(marker).name(),
            best.get()
        );
        Ok((None, best.get()))
    }

    /// Poll until the target process appears or `timeout` elapses.
    fn wait_until_running(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() <= timeout {
            if self.supervisor.is_running() {
                info!("target process detected");
                return true;
            }
            thread::sleep(BOOT_POLL_INTERVAL);
        }
        false
    }

    /// Disjunctive readiness wait: ready when either the window exists and
    /// focus was granted, or a captured frame has valid dimensions and is not
    /// mostly black. Capture errors are retryable here, not fatal.
    fn wait_ready(&mut self) -> bool {
        let title = self.config.window_title.clone();
        let start = Instant::now();
        loop {
            if self.desktop.window_exists(&title) && self.desktop.focus(&title) {
                info!("window focused");
                return true;
            }
            match self.desktop.capture(&title) {
                Ok(frame) => {
                    if frame.width() > 0
                        && frame.height() > 0
                        && !frame.is_mostly_black(BLACK_MEAN_THRESHOLD, BLACK_NONZERO_RATIO)
                    {
                        info!(
                            "window visually ready ({}x{}, source {})",
                            frame.width(),
                            frame.height(),
                            frame.source()
                        );
                        return true;
                    }
                }
                Err(e) => debug!("capture not ready yet: {}", e),
            }
            if start.elapsed() > self.config.ready_timeout() {
                return false;
            }
            thread::sleep(self.config.ready_interval());
        }
    }

    /// The window-relative safe click point, resolved against the current
    /// window rectangle.
    fn safe_click_point(&mut self) -> Option<Point> {
        self.desktop
            .window_rect(&self.config.window_title)
            .map(|rect| rect.at_fraction(self.config.safe_click_x, self.config.safe_click_y))
    }

    /// Translate a frame-relative point to screen coordinates using the
    /// window origin; monitor-fallback frames are already screen-aligned.
    fn frame_to_screen(&mut self, point: Point) -> Point {
        match self.desktop.window_rect(&self.config.window_title) {
            Some(rect) => Point::new(rect.x + point.x, rect.y + point.y),
            None => point,
        }
    }

    /// Center of a freshly captured frame; last-resort click target.
    fn frame_center(&mut self) -> Result<Point> {
        let frame = self.desktop.capture(&self.config.window_title)?;
        Ok(Point::new(
            frame.width() as i32 / 2,
            frame.height() as i32 / 2,
        ))
    }

    fn debug_snapshot(&mut self, state: State) {
        if let Ok(frame) = self.desktop.capture(&self.config.window_title) {
            if let Some(path) = self.diagnostics.try_save_frame(&frame, state, "debug") {
                debug!("[{}] state entry screenshot: {}", state, path.display());
            }
        }
    }

    /// The single failure funnel: log the reason, capture a diagnostic
    /// screenshot, request target termination, and produce the terminal
    /// outcome. Called exactly once per failed run.
    fn fail(&mut self, state: State, reason: String) -> RunOutcome {
        error!("[{}] run failed: {}", state, reason);
        let screenshot = match self.desktop.capture(&self.config.window_title) {
            Ok(frame) => {
                let saved = self.diagnostics.try_save_frame(&frame, state, "fail");
                if let Some(path) = &saved {
                    info!("[{}] failure screenshot: {}", state, path.display());
                }
                saved
            }
            Err(e) => {
                warn!("[{}] could not capture failure screenshot: {}", state, e);
                None
            }
        };
        self.supervisor.terminate();
        RunOutcome::fail(reason, screenshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_gate_initially_ready() {
        let gate = ClickGate::new(Duration::from_millis(50));
        assert!(gate.ready());
    }

    #[test]
    fn test_click_gate_blocks_within_cooldown() {
        let mut gate = ClickGate::new(Duration::from_millis(200));
        gate.fire();
        assert!(!gate.ready());
    }

    #[test]
    fn test_click_gate_reopens_after_cooldown() {
        let mut gate = ClickGate::new(Duration::from_millis(10));
        gate.fire();
        thread::sleep(Duration::from_millis(20));
        assert!(gate.ready());
    }

    #[test]
    fn test_click_gate_refire_resets_window() {
        let mut gate = ClickGate::new(Duration::from_millis(30));
        gate.fire();
        thread::sleep(Duration::from_millis(35));
        assert!(gate.ready());
        gate.fire();
        assert!(!gate.ready());
    }
}
