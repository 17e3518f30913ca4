//! Desktop capability abstraction.
//!
//! The engine never talks to the OS directly; it goes through the [`Desktop`]
//! trait so tests can substitute a scripted implementation. The native
//! implementation lives in [`native`].

mod native;

pub use native::NativeDesktop;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::Frame;

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A window's bounding rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Resolve a fractional offset into this rectangle to screen coordinates.
    ///
    /// This is the safe-click resolver: the same logical target stays valid
    /// across window positions and sizes because the offset is relative.
    pub fn at_fraction(&self, fx: f64, fy: f64) -> Point {
        Point {
            x: self.x + (self.width as f64 * fx) as i32,
            y: self.y + (self.height as f64 * fy) as i32,
        }
    }

    /// Rectangle center.
    pub fn center(&self) -> Point {
        self.at_fraction(0.5, 0.5)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Window discovery, focus, frame capture, and click injection.
///
/// One implementation per target platform plus a scripted fake for tests.
pub trait Desktop {
    /// Returns `true` if a window with the given title currently exists.
    fn window_exists(&self, title: &str) -> bool;

    /// Bounding rectangle of the titled window, if it exists and is non-empty.
    fn window_rect(&self, title: &str) -> Option<Rect>;

    /// Bring the titled window to the foreground. Returns `false` when the
    /// window is missing or the platform refused focus.
    fn focus(&mut self, title: &str) -> bool;

    /// Capture a fresh frame of the titled window, falling back to the
    /// configured monitor when window-bound capture is unavailable.
    fn capture(&mut self, title: &str) -> Result<Frame>;

    /// Inject a single click at the given screen point.
    fn click(&mut self, point: Point) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_fraction() {
        let rect = Rect::new(100, 50, 800, 600);
        let p = rect.at_fraction(0.70, 0.55);
        assert_eq!(p, Point::new(100 + 560, 50 + 330));
    }

    #[test]
    fn test_at_fraction_origin_and_full() {
        let rect = Rect::new(10, 20, 200, 100);
        assert_eq!(rect.at_fraction(0.0, 0.0), Point::new(10, 20));
        assert_eq!(rect.at_fraction(1.0, 1.0), Point::new(210, 120));
    }

    #[test]
    fn test_center() {
        let rect = Rect::new(0, 0, 640, 480);
        assert_eq!(rect.center(), Point::new(320, 240));
    }

    #[test]
    fn test_empty_rect() {
        assert!(Rect::new(5, 5, 0, 100).is_empty());
        assert!(Rect::new(5, 5, 100, 0).is_empty());
        assert!(!Rect::new(5, 5, 1, 1).is_empty());
    }

    #[test]
    fn test_point_display() {
        assert_eq!(Point::new(24, 16).to_string(), "(24, 16)");
    }
}
