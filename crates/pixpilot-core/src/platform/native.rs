//! Native desktop implementation.
//!
//! Window discovery and capture use `xcap` on all platforms. Focus and click
//! injection use Win32 on Windows; other platforms get stubs that report the
//! operation as unsupported.

use tracing::{debug, warn};

use super::{Desktop, Point, Rect};
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameSource};

/// [`Desktop`] backed by the real OS.
#[derive(Debug, Clone)]
pub struct NativeDesktop {
    /// Monitor used when window-bound capture is unavailable
    monitor_index: usize,
}

impl NativeDesktop {
    pub fn new(monitor_index: usize) -> Self {
        Self { monitor_index }
    }

    /// Find the xcap window whose title matches exactly.
    fn find_window(&self, title: &str) -> Option<xcap::Window> {
        let windows = match xcap::Window::all() {
            Ok(windows) => windows,
            Err(e) => {
                warn!("failed to enumerate windows: {}", e);
                return None;
            }
        };
        windows
            .into_iter()
            .find(|w| w.title().map(|t| t == title).unwrap_or(false))
    }

    fn capture_monitor(&self) -> Result<Frame> {
        let monitors = xcap::Monitor::all()
            .map_err(|e| Error::Capture(format!("failed to enumerate monitors: {}", e)))?;
        let monitor = monitors
            .into_iter()
            .nth(self.monitor_index)
            .ok_or_else(|| {
                Error::Capture(format!("no monitor at index {}", self.monitor_index))
            })?;
        let image = monitor
            .capture_image()
            .map_err(|e| Error::Capture(format!("monitor capture failed: {}", e)))?;
        Ok(Frame::new(image, FrameSource::Monitor))
    }
}

impl Desktop for NativeDesktop {
    fn window_exists(&self, title: &str) -> bool {
        self.find_window(title).is_some()
    }

    fn window_rect(&self, title: &str) -> Option<Rect> {
        let window = self.find_window(title)?;
        let x = window.x().ok()?;
        let y = window.y().ok()?;
        let width = window.width().ok()?;
        let height = window.height().ok()?;
        let rect = Rect::new(x, y, width, height);
        if rect.is_empty() {
            return None;
        }
        Some(rect)
    }

    fn focus(&mut self, title: &str) -> bool {
        focus_impl(title)
    }

    fn capture(&mut self, title: &str) -> Result<Frame> {
        if let Some(window) = self.find_window(title) {
            match window.capture_image() {
                Ok(image) => return Ok(Frame::new(image, FrameSource::Window)),
                Err(e) => {
                    debug!("window capture failed ({}), falling back to monitor", e);
                }
            }
        }
        self.capture_monitor()
    }

    fn click(&mut self, point: Point) -> Result<()> {
        click_impl(point)
    }
}

#[cfg(windows)]
fn focus_impl(title: &str) -> bool {
    use windows::core::HSTRING;
    use windows::core::PCWSTR;
    use windows::Win32::UI::WindowsAndMessaging::{
        FindWindowW, SetForegroundWindow, ShowWindow, SW_RESTORE,
    };

    let title = HSTRING::from(title);
    unsafe {
        let hwnd = FindWindowW(PCWSTR::null(), &title);
        if hwnd.0 == 0 {
            return false;
        }
        let _ = ShowWindow(hwnd, SW_RESTORE);
        SetForegroundWindow(hwnd).as_bool()
    }
}

#[cfg(windows)]
fn click_impl(point: Point) -> Result<()> {
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEINPUT,
    };
    use windows::Win32::UI::WindowsAndMessaging::SetCursorPos;

    let mouse_input = |flags| INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };

    unsafe {
        SetCursorPos(point.x, point.y)
            .map_err(|e| Error::Other(format!("failed to move cursor: {}", e)))?;
        let inputs = [
            mouse_input(MOUSEEVENTF_LEFTDOWN),
            mouse_input(MOUSEEVENTF_LEFTUP),
        ];
        let sent = SendInput(&inputs, std::mem::size_of::<INPUT>() as i32);
        if sent != inputs.len() as u32 {
            return Err(Error::Other("click injection was blocked".to_string()));
        }
    }
    Ok(())
}

#[cfg(not(windows))]
fn focus_impl(_title: &str) -> bool {
    // No foreground API wired up; readiness can still be granted visually
    false
}

#[cfg(not(windows))]
fn click_impl(_point: Point) -> Result<()> {
    Err(Error::Other(
        "click injection is only supported on Windows".to_string(),
    ))
}
