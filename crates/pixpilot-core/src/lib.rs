//! # pixpilot-core
//!
//! Core library for synchronizing an external application's UI state with an
//! automation driver purely through pixel observation.
//!
//! A bounded-wait finite state machine advances only when a template match
//! confirms the target application reached an expected screen. The engine
//! sequences waiting, matching, clicking, and cooldown-gated retries under
//! per-state timeouts, and funnels every failure through one diagnostic path.
//!
//! ## Modules
//!
//! - [`config`] - Immutable run configuration and persistence
//! - [`diagnostics`] - Diagnostic screenshot sink
//! - [`engine`] - The synchronization state machine
//! - [`error`] - Error types and Result alias
//! - [`frame`] - Captured frames and degenerate-capture heuristics
//! - [`matcher`] - Template matching and score tracking
//! - [`platform`] - Desktop capability trait and native implementation
//! - [`state`] - Run states and the terminal outcome record
//! - [`supervisor`] - Target process detection, launch, termination
//!
//! ## Example
//!
//! ```no_run
//! use pixpilot_core::{Config, Engine, NativeDesktop, Supervisor};
//!
//! let config = Config::load();
//! let desktop = NativeDesktop::new(config.monitor_index);
//! let supervisor = Supervisor::new(config.process_names.clone(), config.steam_app_id);
//! let mut engine = Engine::new(config, desktop, supervisor).expect("templates");
//! let outcome = engine.run();
//! std::process::exit(outcome.exit_code());
//! ```

// Module declarations
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod frame;
pub mod matcher;
pub mod platform;
pub mod state;
pub mod supervisor;

// Re-export key types for convenience

// Error types
pub use error::{Error, Result};

// Configuration
pub use config::{Config, LoginStrategy, TemplatePaths, Timeouts};

// States and outcomes
pub use state::{RunOutcome, State};

// Frames
pub use frame::{Frame, FrameSource};

// Matching
pub use matcher::{BestScore, MatchResult, Matcher, Template, SCORE_SENTINEL};

// Platform capabilities
pub use platform::{Desktop, NativeDesktop, Point, Rect};

// Engine
pub use engine::{ClickGate, Engine, Markers};

// Process supervision
pub use supervisor::{ProcessControl, Supervisor};

// Diagnostics
pub use diagnostics::Diagnostics;
