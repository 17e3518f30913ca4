//! Diagnostic screenshot sink.
//!
//! Screenshots are written under a configured directory as
//! `<prefix>_<state>_<timestamp>.png`. They are written once and never read
//! back by the engine.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::frame::Frame;
use crate::state::State;

/// Writes diagnostic screenshots for state entries and failures.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `frame` as a PNG named after the prefix, state, and current time.
    pub fn save_frame(&self, frame: &Frame, state: State, prefix: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S%.3f");
        let path = self
            .dir
            .join(format!("{}_{}_{}.png", prefix, state.as_str(), timestamp));
        frame.save_png(&path)?;
        Ok(path)
    }

    /// Like [`save_frame`](Self::save_frame) but logs and discards errors;
    /// diagnostics must never take down the failure funnel itself.
    pub fn try_save_frame(&self, frame: &Frame, state: State, prefix: &str) -> Option<PathBuf> {
        match self.save_frame(frame, state, prefix) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("failed to save {} screenshot: {}", prefix, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameSource;
    use image::{Rgba, RgbaImage};

    fn test_frame() -> Frame {
        Frame::new(
            RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255])),
            FrameSource::Window,
        )
    }

    #[test]
    fn test_save_frame_creates_png() {
        let dir = tempfile::tempdir().unwrap();
        let diagnostics = Diagnostics::new(dir.path());

        let path = diagnostics
            .save_frame(&test_frame(), State::WaitLogin, "fail")
            .unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("fail_wait_login_"));
        assert!(name.ends_with(".png"));

        // The written file decodes back to the same dimensions
        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 8);
        assert_eq!(img.height(), 8);
    }

    #[test]
    fn test_save_frame_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let diagnostics = Diagnostics::new(&nested);
        let path = diagnostics
            .save_frame(&test_frame(), State::Fail, "debug")
            .unwrap();
        assert!(path.starts_with(&nested));
    }

    #[test]
    fn test_try_save_frame_swallows_errors() {
        // A path that cannot be created as a directory
        let file = tempfile::NamedTempFile::new().unwrap();
        let diagnostics = Diagnostics::new(file.path());
        assert!(diagnostics
            .try_save_frame(&test_frame(), State::Fail, "fail")
            .is_none());
    }
}
