//! Template matching: normalized cross-correlation scoring and the
//! match/no-match decision policy.
//!
//! Matching is fixed-template, single-scale, single-orientation. Frames and
//! templates are both reduced to luma before comparison, the score is a single
//! scalar in [-1, 1], and a match is declared when the score reaches the
//! configured global threshold (inclusive).

use std::path::Path;

use image::GrayImage;

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::platform::Point;

/// Sentinel below any valid correlation score, so the first observed score
/// always registers as an improvement.
pub const SCORE_SENTINEL: f32 = -2.0;

/// A named reference image, loaded once and shared read-only.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    /// Luma pixels (templates are stored without alpha)
    image: GrayImage,
    /// Mean-subtracted pixel values, row-major
    zero_mean: Vec<f64>,
    /// L2 norm of `zero_mean`; 0.0 for flat or empty templates
    norm: f64,
}

impl Template {
    /// Load a template from disk, converting to luma.
    pub fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let image = image::open(path)
            .map_err(|e| Error::Template {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .to_luma8();
        Ok(Self::from_image(name, image))
    }

    /// Build a template from an in-memory image.
    pub fn from_image(name: impl Into<String>, image: GrayImage) -> Self {
        let pixels = image.as_raw();
        let n = pixels.len();
        let mean = if n == 0 {
            0.0
        } else {
            pixels.iter().map(|&p| p as f64).sum::<f64>() / n as f64
        };
        let zero_mean: Vec<f64> = pixels.iter().map(|&p| p as f64 - mean).collect();
        let norm = zero_mean.iter().map(|v| v * v).sum::<f64>().sqrt();
        Self {
            name: name.into(),
            image,
            zero_mean,
            norm,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Outcome of one match attempt.
///
/// `location` is present whenever at least one candidate alignment was
/// evaluated, independent of `matched`, so the best-score-observed logging
/// contract holds even on non-matches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    /// Center of the best-scoring alignment
    pub location: Option<Point>,
    /// Normalized correlation score in [-1, 1]; 0.0 when no candidate existed
    pub score: f32,
}

impl MatchResult {
    /// Result for degenerate inputs where no alignment could be evaluated.
    pub fn no_candidate() -> Self {
        Self {
            matched: false,
            location: None,
            score: 0.0,
        }
    }
}

/// Computes similarity scores and applies the threshold decision.
///
/// Pure function of its inputs; never mutates the frame or template.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    threshold: f32,
}

impl Matcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// The threshold decision: inclusive at the boundary.
    pub fn is_match(&self, score: f32) -> bool {
        score >= self.threshold
    }

    /// Match `template` against `frame` at native scale.
    ///
    /// Frames smaller than the template in either dimension, and empty
    /// templates, yield [`MatchResult::no_candidate`] rather than an error.
    pub fn find(&self, frame: &Frame, template: &Template) -> MatchResult {
        if template.is_degenerate() {
            return MatchResult::no_candidate();
        }
        if frame.width() < template.width() || frame.height() < template.height() {
            return MatchResult::no_candidate();
        }

        let haystack = frame.to_luma();
        let (score, best_x, best_y) = best_alignment(&haystack, template);

        let center = Point {
            x: best_x as i32 + template.width() as i32 / 2,
            y: best_y as i32 + template.height() as i32 / 2,
        };
        MatchResult {
            matched: self.is_match(score),
            location: Some(center),
            score,
        }
    }
}

/// Scan every alignment and return `(best score, x, y)` of the top-left of
/// the best-scoring placement.
fn best_alignment(haystack: &GrayImage, template: &Template) -> (f32, u32, u32) {
    let (fw, fh) = (haystack.width() as usize, haystack.height() as usize);
    let (tw, th) = (template.width() as usize, template.height() as usize);
    let frame_px = haystack.as_raw();

    // Integral images over the frame for per-region sum and sum of squares
    let (integral, integral_sq) = integrals(frame_px, fw, fh);
    let n = (tw * th) as f64;

    let mut best_score = f64::MIN;
    let mut best = (0u32, 0u32);

    for y in 0..=(fh - th) {
        for x in 0..=(fw - tw) {
            let sum = region_sum(&integral, fw, x, y, tw, th);
            let sum_sq = region_sum(&integral_sq, fw, x, y, tw, th);
            // Region variance term: sum of squared deviations from the mean
            let var_sum = sum_sq - sum * sum / n;
            let denom = template.norm * var_sum.max(0.0).sqrt();

            let score = if denom <= f64::EPSILON {
                // Flat region or flat template: correlation undefined
                0.0
            } else {
                let mut cross = 0.0f64;
                for ty in 0..th {
                    let frow = (y + ty) * fw + x;
                    let trow = ty * tw;
                    for tx in 0..tw {
                        // Template is zero-mean, so the frame mean cancels
                        cross += frame_px[frow + tx] as f64 * template.zero_mean[trow + tx];
                    }
                }
                (cross / denom).clamp(-1.0, 1.0)
            };

            if score > best_score {
                best_score = score;
                best = (x as u32, y as u32);
            }
        }
    }

    (best_score as f32, best.0, best.1)
}

/// Build summed-area tables of pixel values and squared pixel values.
/// Tables are `(w + 1) * (h + 1)` with a zero border row/column.
fn integrals(pixels: &[u8], w: usize, h: usize) -> (Vec<f64>, Vec<f64>) {
    let stride = w + 1;
    let mut sum = vec![0.0f64; stride * (h + 1)];
    let mut sum_sq = vec![0.0f64; stride * (h + 1)];
    for y in 0..h {
        let mut row = 0.0f64;
        let mut row_sq = 0.0f64;
        for x in 0..w {
            let v = pixels[y * w + x] as f64;
            row += v;
            row_sq += v * v;
            let i = (y + 1) * stride + (x + 1);
            sum[i] = sum[y * stride + (x + 1)] + row;
            sum_sq[i] = sum_sq[y * stride + (x + 1)] + row_sq;
        }
    }
    (sum, sum_sq)
}

/// Sum of a `tw x th` region with top-left `(x, y)` from a summed-area table.
fn region_sum(integral: &[f64], w: usize, x: usize, y: usize, tw: usize, th: usize) -> f64 {
    let stride = w + 1;
    integral[(y + th) * stride + (x + tw)] + integral[y * stride + x]
        - integral[y * stride + (x + tw)]
        - integral[(y + th) * stride + x]
}

/// Accumulator for the maximum score observed across an entire wait.
///
/// Starts below any valid score so the first poll always registers, and is
/// monotonically non-decreasing thereafter.
#[derive(Debug, Clone, Copy)]
pub struct BestScore(f32);

impl BestScore {
    pub fn new() -> Self {
        Self(SCORE_SENTINEL)
    }

    /// Fold in one observation; returns `true` when it improved the maximum.
    pub fn observe(&mut self, score: f32) -> bool {
        if score > self.0 {
            self.0 = score;
            true
        } else {
            false
        }
    }

    /// Best score seen so far, clamped up to 0.0 for reporting when nothing
    /// was ever observed.
    pub fn get(&self) -> f32 {
        self.0.max(0.0)
    }
}

impl Default for BestScore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameSource;
    use image::{Luma, Rgba, RgbaImage};

    /// A small high-variance pattern that cannot be confused with flat fill.
    fn checker_template(w: u32, h: u32) -> Template {
        let image = GrayImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Luma([230u8])
            } else {
                Luma([20u8])
            }
        });
        Template::from_image("checker", image)
    }

    /// A gray frame with the checker pattern composited at `(ox, oy)`.
    fn frame_with_pattern(fw: u32, fh: u32, ox: u32, oy: u32, tw: u32, th: u32) -> Frame {
        let mut pixels = RgbaImage::from_pixel(fw, fh, Rgba([128, 128, 128, 255]));
        for y in 0..th {
            for x in 0..tw {
                let v = if (x + y) % 2 == 0 { 230u8 } else { 20u8 };
                pixels.put_pixel(ox + x, oy + y, Rgba([v, v, v, 255]));
            }
        }
        Frame::new(pixels, FrameSource::Window)
    }

    fn blank_frame(w: u32, h: u32) -> Frame {
        Frame::new(
            RgbaImage::from_pixel(w, h, Rgba([128, 128, 128, 255])),
            FrameSource::Window,
        )
    }

    #[test]
    fn test_exact_pattern_scores_near_one() {
        let template = checker_template(8, 8);
        let frame = frame_with_pattern(64, 48, 20, 12, 8, 8);
        let result = Matcher::new(0.85).find(&frame, &template);

        assert!(result.matched);
        assert!(result.score > 0.99, "score was {}", result.score);
        let loc = result.location.unwrap();
        assert_eq!(loc.x, 24); // 20 + 8/2
        assert_eq!(loc.y, 16); // 12 + 8/2
    }

    #[test]
    fn test_blank_frame_does_not_match_but_reports_candidate() {
        let template = checker_template(8, 8);
        let frame = blank_frame(32, 32);
        let result = Matcher::new(0.85).find(&frame, &template);

        assert!(!result.matched);
        assert!(result.score < 0.85);
        // A candidate alignment was still evaluated
        assert!(result.location.is_some());
    }

    #[test]
    fn test_frame_smaller_than_template() {
        let template = checker_template(16, 16);
        for (w, h) in [(8, 32), (32, 8), (8, 8)] {
            let result = Matcher::new(0.85).find(&blank_frame(w, h), &template);
            assert_eq!(result, MatchResult::no_candidate());
        }
    }

    #[test]
    fn test_empty_template_never_matches() {
        let template = Template::from_image("empty", GrayImage::new(0, 0));
        let result = Matcher::new(0.85).find(&blank_frame(16, 16), &template);
        assert_eq!(result, MatchResult::no_candidate());
    }

    #[test]
    fn test_flat_template_scores_zero() {
        let flat = Template::from_image("flat", GrayImage::from_pixel(4, 4, Luma([100u8])));
        let result = Matcher::new(0.85).find(&blank_frame(16, 16), &flat);
        assert!(!result.matched);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let matcher = Matcher::new(0.85);
        assert!(matcher.is_match(0.85));
        assert!(matcher.is_match(0.86));
        assert!(!matcher.is_match(0.8499999));
    }

    #[test]
    fn test_missing_template_file() {
        let err = Template::load(std::path::Path::new("/nonexistent/marker.png"));
        assert!(matches!(err, Err(Error::Template { .. })));
    }

    #[test]
    fn test_best_score_monotonic() {
        let mut best = BestScore::new();
        assert!(best.observe(0.1));
        assert!(best.observe(0.4));
        assert!(!best.observe(0.2));
        assert!(!best.observe(0.4));
        assert!(best.observe(0.9));
        assert_eq!(best.get(), 0.9);
    }

    #[test]
    fn test_best_score_first_observation_registers() {
        // Even a strongly negative correlation must register as an update
        let mut best = BestScore::new();
        assert!(best.observe(-1.0));
        assert_eq!(best.get(), 0.0); // reported clamped
    }

    #[test]
    fn test_pattern_at_origin() {
        let template = checker_template(6, 6);
        let frame = frame_with_pattern(24, 24, 0, 0, 6, 6);
        let result = Matcher::new(0.85).find(&frame, &template);
        assert!(result.matched);
        let loc = result.location.unwrap();
        assert_eq!((loc.x, loc.y), (3, 3));
    }

    #[test]
    fn test_template_name_from_load_path() {
        let template = checker_template(4, 4);
        assert_eq!(template.name(), "checker");
    }
}
