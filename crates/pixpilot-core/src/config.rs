//! Configuration for a synchronization run.
//!
//! All values are loaded once at startup into an immutable [`Config`] that is
//! threaded explicitly into the engine and matcher. Defaults target the
//! Limbus Company Steam client, the application this tool was originally
//! built for, but every field can be overridden via the JSON config file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::state::State;

/// Strategy used while waiting on the login screen.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoginStrategy {
    /// Wait for the login marker, then click its matched location once.
    WaitThenClick,
    /// Poll the connecting and main-menu markers while periodically clicking
    /// a window-relative safe point, gated by the click cooldown.
    #[default]
    CooldownPolling,
}

/// Per-state maximum wait durations, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    /// Waiting for the target process to appear after launch
    pub boot: f64,
    /// Waiting for the login marker
    pub wait_login: f64,
    /// Waiting for the connecting marker after the login click
    pub click_login: f64,
    /// Waiting for the main-menu marker
    pub wait_main_menu: f64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            boot: 60.0,
            wait_login: 30.0,
            click_login: 5.0,
            wait_main_menu: 45.0,
        }
    }
}

impl Timeouts {
    /// Maximum wait for the given state. Terminal states and Start have no
    /// marker wait of their own.
    pub fn for_state(&self, state: State) -> Duration {
        let secs = match state {
            State::WaitLogin => self.wait_login,
            State::ClickLogin => self.click_login,
            State::WaitMainMenu => self.wait_main_menu,
            State::Start | State::Ok | State::Fail => 0.0,
        };
        Duration::from_secs_f64(secs)
    }
}

/// Template asset paths, one per on-screen marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatePaths {
    /// Login screen marker (the clickable prompt)
    pub login_marker: PathBuf,
    /// Secondary login UI marker, polled by the cooldown strategy
    pub login_ui_marker: PathBuf,
    /// Connecting/loading transition marker
    pub connecting_marker: PathBuf,
    /// Main menu marker
    pub main_menu_marker: PathBuf,
}

impl TemplatePaths {
    fn in_dir(dir: &std::path::Path) -> Self {
        Self {
            login_marker: dir.join("login_marker_A.png"),
            login_ui_marker: dir.join("login_ui_marker.png"),
            connecting_marker: dir.join("connecting_marker.png"),
            main_menu_marker: dir.join("mainmenu_marker_B.png"),
        }
    }
}

/// Configuration for pixpilot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Exact title of the target application's window
    pub window_title: String,
    /// Candidate executable names for the target process
    pub process_names: Vec<String>,
    /// Steam app id used to launch the target
    pub steam_app_id: u32,
    /// Monitor index used when window-bound capture is unavailable
    pub monitor_index: usize,
    /// Per-state timeouts
    pub timeouts: Timeouts,
    /// Seconds between poll iterations
    pub poll_interval: f64,
    /// Minimum seconds between injected clicks
    pub click_cooldown: f64,
    /// Maximum seconds to wait for window readiness
    pub ready_timeout: f64,
    /// Seconds between readiness checks
    pub ready_interval: f64,
    /// Global match threshold; a score at or above this is a match
    pub match_threshold: f32,
    /// Which WaitLogin policy to use
    pub login_strategy: LoginStrategy,
    /// Fractional x offset into the window for the safe click point
    pub safe_click_x: f64,
    /// Fractional y offset into the window for the safe click point
    pub safe_click_y: f64,
    /// Marker template paths
    pub templates: TemplatePaths,
    /// Directory for run logs and diagnostic screenshots
    pub diagnostics_dir: PathBuf,
    /// Save a screenshot on every state entry, not only on failure
    pub debug_snapshots: bool,
}

impl Default for Config {
    fn default() -> Self {
        let assets_dir = PathBuf::from("assets");
        let diagnostics_dir = dirs::desktop_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("pixpilot_logs");
        Self {
            window_title: "LimbusCompany".to_string(),
            process_names: vec![
                "LimbusCompany.exe".to_string(),
                "Limbus Company.exe".to_string(),
            ],
            steam_app_id: 1973530,
            monitor_index: 0,
            timeouts: Timeouts::default(),
            poll_interval: 0.5,
            click_cooldown: 2.5,
            ready_timeout: 180.0,
            ready_interval: 0.5,
            match_threshold: 0.85,
            login_strategy: LoginStrategy::default(),
            safe_click_x: 0.70,
            safe_click_y: 0.55,
            templates: TemplatePaths::in_dir(&assets_dir),
            diagnostics_dir,
            debug_snapshots: false,
        }
    }
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pixpilot").join("config.json"))
    }

    /// Load config from disk, falling back to defaults if not found
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| std::fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Load config from an explicit file path
    pub fn load_from(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save config to disk
    pub fn save(&self) -> std::io::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(self)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            std::fs::write(&path, content)?;
        }
        Ok(())
    }

    /// Steam browser-protocol URI for the target
    pub fn steam_uri(&self) -> String {
        format!("steam://rungameid/{}", self.steam_app_id)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval)
    }

    pub fn click_cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.click_cooldown)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.ready_timeout)
    }

    pub fn ready_interval(&self) -> Duration {
        Duration::from_secs_f64(self.ready_interval)
    }

    pub fn boot_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeouts.boot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let t = Timeouts::default();
        assert_eq!(t.for_state(State::WaitLogin), Duration::from_secs(30));
        assert_eq!(t.for_state(State::ClickLogin), Duration::from_secs(5));
        assert_eq!(t.for_state(State::WaitMainMenu), Duration::from_secs(45));
        assert_eq!(t.for_state(State::Ok), Duration::ZERO);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_title, "LimbusCompany");
        assert_eq!(config.process_names.len(), 2);
        assert_eq!(config.match_threshold, 0.85);
        assert_eq!(config.login_strategy, LoginStrategy::CooldownPolling);
        assert_eq!(config.steam_uri(), "steam://rungameid/1973530");
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.match_threshold = 0.9;
        config.login_strategy = LoginStrategy::WaitThenClick;

        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.match_threshold, 0.9);
        assert_eq!(back.login_strategy, LoginStrategy::WaitThenClick);
        assert_eq!(back.window_title, config.window_title);
    }

    #[test]
    fn test_duration_accessors() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.click_cooldown(), Duration::from_millis(2500));
        assert_eq!(config.boot_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_template_paths_in_dir() {
        let paths = TemplatePaths::in_dir(std::path::Path::new("assets"));
        assert!(paths.login_marker.ends_with("login_marker_A.png"));
        assert!(paths.main_menu_marker.ends_with("mainmenu_marker_B.png"));
    }
}
