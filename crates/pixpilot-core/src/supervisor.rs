//! Target process detection, launch, and termination.
//!
//! Detection goes through the `sysinfo` crate on every platform. Launch is
//! best-effort: the Steam browser-protocol URI first, then a direct
//! `steam -applaunch` invocation. Termination swallows already-gone and
//! access-denied conditions.

use std::process::Command;

use sysinfo::{ProcessRefreshKind, RefreshKind, System};
use tracing::{info, warn};

/// Process-level control of the target application.
///
/// Implemented natively by [`Supervisor`]; tests script their own.
pub trait ProcessControl {
    /// Returns `true` if any candidate target process is running.
    fn is_running(&mut self) -> bool;

    /// Try to start the target. Returns `true` if a launch mechanism was
    /// dispatched; the process may still take a while to appear.
    fn launch(&mut self) -> bool;

    /// Best-effort termination of all matching target processes.
    fn terminate(&mut self);
}

/// Native supervisor for a Steam-launched target.
pub struct Supervisor {
    /// Candidate executable names for the target
    process_names: Vec<String>,
    /// Steam app id used by both launch mechanisms
    steam_app_id: u32,
    sys: System,
}

impl Supervisor {
    pub fn new(process_names: Vec<String>, steam_app_id: u32) -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::new().with_processes(ProcessRefreshKind::new()),
        );
        Self {
            process_names,
            steam_app_id,
            sys,
        }
    }

    fn matches_target(&self, process_name: &str) -> bool {
        let name = process_name.to_lowercase();
        self.process_names.iter().any(|candidate| {
            let candidate = candidate.to_lowercase();
            name == candidate || name == candidate.trim_end_matches(".exe")
        })
    }

    fn steam_uri(&self) -> String {
        format!("steam://rungameid/{}", self.steam_app_id)
    }
}

impl ProcessControl for Supervisor {
    fn is_running(&mut self) -> bool {
        self.sys.refresh_processes();
        self.sys
            .processes()
            .values()
            .any(|p| self.matches_target(p.name()))
    }

    fn launch(&mut self) -> bool {
        let uri = self.steam_uri();
        info!("launching target via {}", uri);
        if open_uri(&uri) {
            return true;
        }
        warn!("steam URI launch failed, trying steam -applaunch");
        match Command::new(steam_binary())
            .args(["-applaunch", &self.steam_app_id.to_string()])
            .spawn()
        {
            Ok(_) => true,
            Err(e) => {
                warn!("steam launch failed: {}", e);
                false
            }
        }
    }

    fn terminate(&mut self) {
        self.sys.refresh_processes();
        for (pid, process) in self.sys.processes() {
            if self.matches_target(process.name()) {
                info!("terminating {} ({})", process.name(), pid);
                // kill() returning false means already gone or access denied;
                // both are acceptable here
                let _ = process.kill();
            }
        }
    }
}

#[cfg(windows)]
fn open_uri(uri: &str) -> bool {
    // `start` resolves the steam:// protocol handler
    Command::new("cmd")
        .args(["/C", "start", "", uri])
        .spawn()
        .is_ok()
}

#[cfg(windows)]
fn steam_binary() -> &'static str {
    "steam.exe"
}

#[cfg(not(windows))]
fn open_uri(uri: &str) -> bool {
    Command::new("xdg-open").arg(uri).spawn().is_ok()
}

#[cfg(not(windows))]
fn steam_binary() -> &'static str {
    "steam"
}
