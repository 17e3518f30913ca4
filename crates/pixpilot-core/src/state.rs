//! Run states and the terminal outcome record.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// States of the synchronization state machine.
///
/// Transitions are one-directional; [`State::Ok`] and [`State::Fail`] are
/// terminal and end the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    /// Establish preconditions: process running, window focused
    Start,
    /// Waiting for the login screen marker
    WaitLogin,
    /// Login clicked, waiting for the connecting marker
    ClickLogin,
    /// Waiting for the main-menu marker
    WaitMainMenu,
    /// Terminal: main menu reached
    Ok,
    /// Terminal: run failed
    Fail,
}

impl State {
    /// Returns the stable name used in logs and screenshot filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::WaitLogin => "wait_login",
            Self::ClickLogin => "click_login",
            Self::WaitMainMenu => "wait_main_menu",
            Self::Ok => "ok",
            Self::Fail => "fail",
        }
    }

    /// Returns `true` if this state ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ok | Self::Fail)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal record of a synchronization run.
///
/// Created exactly once per run and immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Final state, always terminal
    pub state: State,
    /// Human-readable reason; embeds the best observed score on timeouts
    pub reason: String,
    /// Failure screenshot path, when one was captured
    pub screenshot: Option<PathBuf>,
}

impl RunOutcome {
    /// Successful outcome.
    pub fn ok(reason: impl Into<String>) -> Self {
        Self {
            state: State::Ok,
            reason: reason.into(),
            screenshot: None,
        }
    }

    /// Failed outcome, optionally with a diagnostic screenshot.
    pub fn fail(reason: impl Into<String>, screenshot: Option<PathBuf>) -> Self {
        Self {
            state: State::Fail,
            reason: reason.into(),
            screenshot,
        }
    }

    /// Returns `true` if the run reached the main menu.
    pub fn is_ok(&self) -> bool {
        self.state == State::Ok
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.is_ok() {
            0
        } else {
            1
        }
    }
}
