//! SceneCast platform core contracts.
//!
//! Capture collaborators (screen grabbing, window enumeration, camera
//! devices) are consumed through the traits in this crate so the capture
//! and render crates never couple to a concrete OS backend.
//!
//! Backends are **not** shareable across threads: a [`BackendFactory`] is
//! shared, and every thread that captures asks it for its own
//! [`CaptureBackend`] instance.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use scenecast_common::error::ScenecastResult;

/// Pixel buffer used throughout the pipeline (8-bit RGBA, row-major).
pub type Frame = RgbaImage;

/// Screen-space rectangle in physical pixels, `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build from an origin and a size.
    pub fn from_origin_size(x: i32, y: i32, width: u32, height: u32) -> Self {
        let width = i32::try_from(width).unwrap_or(i32::MAX);
        let height = i32::try_from(height).unwrap_or(i32::MAX);
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    /// Width in pixels; zero for inverted rectangles.
    pub fn width(&self) -> u32 {
        (i64::from(self.right) - i64::from(self.left)).max(0) as u32
    }

    /// Height in pixels; zero for inverted rectangles.
    pub fn height(&self) -> u32 {
        (i64::from(self.bottom) - i64::from(self.top)).max(0) as u32
    }

    /// Whether the rectangle is smaller than the given minimum size.
    pub fn is_smaller_than(&self, min_width: u32, min_height: u32) -> bool {
        self.width() < min_width.max(1) || self.height() < min_height.max(1)
    }

    /// Shrink the rectangle (keeping its top-left corner) to at most the given size.
    pub fn clamp_size(&self, max_width: u32, max_height: u32) -> Rect {
        Rect::from_origin_size(
            self.left,
            self.top,
            self.width().min(max_width),
            self.height().min(max_height),
        )
    }

    /// Whether the point lies inside the rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// Opaque native window identifier.
pub type WindowHandle = u32;

/// A top-level window as reported by the window system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    /// Owning application / process name.
    pub process: String,
    pub rect: Rect,
}

/// Information about a connected monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorInfo {
    /// Monitor name/identifier.
    pub name: String,
    /// Resolution in physical pixels.
    pub width: u32,
    pub height: u32,
    /// Position in the virtual desktop (pixels).
    pub x: i32,
    pub y: i32,
    /// Whether this monitor is primary.
    pub primary: bool,
}

impl MonitorInfo {
    /// Monitor bounds in virtual-desktop coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.x, self.y, self.width, self.height)
    }
}

/// Pick the monitor that holds the top-left corner of `rect`, falling back
/// to the primary monitor and then the first one.
pub fn monitor_for_rect<'a>(monitors: &'a [MonitorInfo], rect: &Rect) -> Option<&'a MonitorInfo> {
    monitors
        .iter()
        .find(|m| m.bounds().contains(rect.left, rect.top))
        .or_else(|| monitors.iter().find(|m| m.primary))
        .or_else(|| monitors.first())
}

/// An open camera device. Dropping the stream closes the device.
pub trait CameraStream {
    /// Read the next frame. `Ok(None)` means no frame was ready.
    fn read_frame(&mut self) -> ScenecastResult<Option<Frame>>;
}

/// Per-thread capture backend.
///
/// Instances are created and used on a single thread; implementations may
/// hold thread-affine native handles.
pub trait CaptureBackend {
    /// Grab the primary display (`None`) or a desktop region.
    fn grab_screen(&mut self, region: Option<Rect>) -> ScenecastResult<Frame>;

    /// Open a camera at the requested capture size.
    fn open_camera(
        &mut self,
        index: u32,
        width: u32,
        height: u32,
    ) -> ScenecastResult<Box<dyn CameraStream>>;
}

/// Shared factory that hands out one [`CaptureBackend`] per thread.
pub trait BackendFactory: Send + Sync {
    fn create(&self) -> ScenecastResult<Box<dyn CaptureBackend>>;
}

/// Window enumeration and rectangle lookup.
pub trait WindowProvider: Send + Sync {
    fn enumerate_windows(&self) -> ScenecastResult<Vec<WindowInfo>>;

    /// Current rectangle of a window, `None` if it no longer exists.
    fn window_rect(&self, handle: WindowHandle) -> ScenecastResult<Option<Rect>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(name: &str, x: i32, primary: bool) -> MonitorInfo {
        MonitorInfo {
            name: name.to_string(),
            width: 1920,
            height: 1080,
            x,
            y: 0,
            primary,
        }
    }

    #[test]
    fn rect_size_and_degenerate_checks() {
        let rect = Rect::new(0, 0, 40, 30);
        assert_eq!(rect.width(), 40);
        assert_eq!(rect.height(), 30);
        assert!(rect.is_smaller_than(50, 50));
        assert!(!Rect::new(10, 10, 110, 90).is_smaller_than(50, 50));
        assert_eq!(Rect::new(100, 100, 50, 50).width(), 0);
    }

    #[test]
    fn clamp_size_keeps_origin() {
        let rect = Rect::new(-100, 20, 5000, 3000).clamp_size(3840, 2160);
        assert_eq!(rect, Rect::new(-100, 20, 3740, 2180));
    }

    #[test]
    fn monitor_lookup_prefers_containing_monitor() {
        let monitors = vec![monitor("left", -1920, false), monitor("main", 0, true)];
        let rect = Rect::new(-500, 10, -100, 300);
        assert_eq!(monitor_for_rect(&monitors, &rect).unwrap().name, "left");

        let off_screen = Rect::new(9000, 9000, 9100, 9100);
        assert_eq!(monitor_for_rect(&monitors, &off_screen).unwrap().name, "main");
    }
}
