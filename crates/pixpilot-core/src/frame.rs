//! Captured frames and degenerate-capture heuristics.

use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where a frame's pixels came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameSource {
    /// Captured from the target window's bounding rectangle
    Window,
    /// Fallback capture of a whole monitor
    Monitor,
}

impl FrameSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Window => "window",
            Self::Monitor => "monitor",
        }
    }
}

impl std::fmt::Display for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable captured image plus its acquisition metadata.
///
/// Produced fresh on each poll and consumed within the same iteration;
/// frames are never cached across polls.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: RgbaImage,
    source: FrameSource,
}

impl Frame {
    pub fn new(pixels: RgbaImage, source: FrameSource) -> Self {
        Self { pixels, source }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn source(&self) -> FrameSource {
        self.source
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Collapse to single-channel luma, discarding alpha.
    ///
    /// Both window captures (BGRA) and monitor captures are normalized to the
    /// same layout here, so the matcher never sees a channel-depth mismatch.
    pub fn to_luma(&self) -> GrayImage {
        image::DynamicImage::ImageRgba8(self.pixels.clone()).to_luma8()
    }

    /// Heuristic for loading/black-screen frames: mean intensity at or below
    /// `mean_threshold`, or fraction of non-zero pixels at or below
    /// `nonzero_ratio`. Zero-sized frames are always degenerate.
    pub fn is_mostly_black(&self, mean_threshold: f64, nonzero_ratio: f64) -> bool {
        let gray = self.to_luma();
        let total = gray.as_raw().len();
        if total == 0 {
            return true;
        }
        let mut sum: u64 = 0;
        let mut nonzero: usize = 0;
        for &px in gray.as_raw() {
            sum += px as u64;
            if px != 0 {
                nonzero += 1;
            }
        }
        let mean = sum as f64 / total as f64;
        let ratio = nonzero as f64 / total as f64;
        mean <= mean_threshold || ratio <= nonzero_ratio
    }

    /// Write the frame to `path` as PNG.
    pub fn save_png(&self, path: &std::path::Path) -> Result<()> {
        self.pixels.save(path)?;
        Ok(())
    }
}
