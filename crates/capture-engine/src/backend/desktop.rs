//! Screen, region, and window enumeration through `xcap`.

use image::imageops;
use xcap::{Monitor, Window};

use scenecast_common::error::{ScenecastError, ScenecastResult};
use scenecast_platform_core::{
    monitor_for_rect, BackendFactory, CameraStream, CaptureBackend, Frame, MonitorInfo, Rect,
    WindowHandle, WindowInfo, WindowProvider,
};

use super::camera::GstCameraStream;

/// Creates [`NativeBackend`] instances.
pub struct NativeBackendFactory;

impl BackendFactory for NativeBackendFactory {
    fn create(&self) -> ScenecastResult<Box<dyn CaptureBackend>> {
        Ok(Box::new(NativeBackend::new()?))
    }
}

/// Per-thread desktop + camera backend.
pub struct NativeBackend {
    monitors: Vec<(MonitorInfo, Monitor)>,
}

impl NativeBackend {
    pub fn new() -> ScenecastResult<Self> {
        let monitors = Monitor::all()
            .map_err(|e| ScenecastError::capture(format!("Failed to enumerate monitors: {e}")))?
            .into_iter()
            .enumerate()
            .map(|(index, monitor)| (describe_monitor(index, &monitor), monitor))
            .collect::<Vec<_>>();

        if monitors.is_empty() {
            return Err(ScenecastError::capture("No monitors found"));
        }
        tracing::debug!(count = monitors.len(), "Capture backend created");
        Ok(Self { monitors })
    }

    fn primary(&self) -> &(MonitorInfo, Monitor) {
        self.monitors
            .iter()
            .find(|(info, _)| info.primary)
            .unwrap_or(&self.monitors[0])
    }

    fn monitor_for(&self, region: &Rect) -> &(MonitorInfo, Monitor) {
        let infos: Vec<MonitorInfo> = self.monitors.iter().map(|(info, _)| info.clone()).collect();
        monitor_for_rect(&infos, region)
            .and_then(|found| self.monitors.iter().find(|(info, _)| info == found))
            .unwrap_or_else(|| self.primary())
    }
}

fn describe_monitor(index: usize, monitor: &Monitor) -> MonitorInfo {
    MonitorInfo {
        name: monitor.name().unwrap_or_else(|_| format!("Display {index}")),
        width: monitor.width().unwrap_or(0),
        height: monitor.height().unwrap_or(0),
        x: monitor.x().unwrap_or(0),
        y: monitor.y().unwrap_or(0),
        primary: monitor.is_primary().unwrap_or(index == 0),
    }
}

impl CaptureBackend for NativeBackend {
    fn grab_screen(&mut self, region: Option<Rect>) -> ScenecastResult<Frame> {
        let Some(region) = region else {
            let (info, monitor) = self.primary();
            return monitor.capture_image().map_err(|e| {
                ScenecastError::capture(format!("Failed to capture {}: {e}", info.name))
            });
        };

        let (info, monitor) = self.monitor_for(&region);
        let image = monitor
            .capture_image()
            .map_err(|e| ScenecastError::capture(format!("Failed to capture {}: {e}", info.name)))?;

        let (x, y, width, height) = crop_window(&region, info, image.width(), image.height())
            .ok_or_else(|| ScenecastError::capture("Capture region is off-screen"))?;
        Ok(imageops::crop_imm(&image, x, y, width, height).to_image())
    }

    fn open_camera(
        &mut self,
        index: u32,
        width: u32,
        height: u32,
    ) -> ScenecastResult<Box<dyn CameraStream>> {
        Ok(Box::new(GstCameraStream::open(index, width, height)?))
    }
}

/// Intersect a desktop `region` with a monitor image, in image coordinates.
///
/// The image may be scaled relative to the monitor's logical size; the
/// region is mapped through that ratio.
fn crop_window(
    region: &Rect,
    monitor: &MonitorInfo,
    image_width: u32,
    image_height: u32,
) -> Option<(u32, u32, u32, u32)> {
    let ratio_x = image_width as f64 / monitor.width.max(1) as f64;
    let ratio_y = image_height as f64 / monitor.height.max(1) as f64;

    let left = ((region.left - monitor.x) as f64 * ratio_x).round() as i64;
    let top = ((region.top - monitor.y) as f64 * ratio_y).round() as i64;
    let right = ((region.right - monitor.x) as f64 * ratio_x).round() as i64;
    let bottom = ((region.bottom - monitor.y) as f64 * ratio_y).round() as i64;

    let left = left.clamp(0, i64::from(image_width));
    let top = top.clamp(0, i64::from(image_height));
    let right = right.clamp(0, i64::from(image_width));
    let bottom = bottom.clamp(0, i64::from(image_height));
    if right <= left || bottom <= top {
        return None;
    }
    Some((
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

/// Window enumeration through `xcap::Window`.
pub struct NativeWindowProvider;

impl WindowProvider for NativeWindowProvider {
    fn enumerate_windows(&self) -> ScenecastResult<Vec<WindowInfo>> {
        let windows = Window::all()
            .map_err(|e| ScenecastError::platform(format!("Failed to enumerate windows: {e}")))?;

        Ok(windows
            .iter()
            .filter(|w| !w.is_minimized().unwrap_or(false))
            .filter_map(describe_window)
            .filter(|info| !info.title.trim().is_empty())
            .collect())
    }

    fn window_rect(&self, handle: WindowHandle) -> ScenecastResult<Option<Rect>> {
        let windows = Window::all()
            .map_err(|e| ScenecastError::platform(format!("Failed to enumerate windows: {e}")))?;
        Ok(windows
            .iter()
            .filter_map(describe_window)
            .find(|info| info.handle == handle)
            .map(|info| info.rect))
    }
}

fn describe_window(window: &Window) -> Option<WindowInfo> {
    let handle = window.id().ok()?;
    let rect = Rect::from_origin_size(
        window.x().ok()?,
        window.y().ok()?,
        window.width().ok()?,
        window.height().ok()?,
    );
    Some(WindowInfo {
        handle,
        title: window.title().unwrap_or_default(),
        process: window.app_name().unwrap_or_default(),
        rect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(x: i32, width: u32, height: u32) -> MonitorInfo {
        MonitorInfo {
            name: "test".into(),
            width,
            height,
            x,
            y: 0,
            primary: true,
        }
    }

    #[test]
    fn crop_maps_region_into_monitor_image() {
        let m = monitor(1920, 1920, 1080);
        let region = Rect::new(2000, 100, 2400, 400);
        assert_eq!(crop_window(&region, &m, 1920, 1080), Some((80, 100, 400, 300)));
    }

    #[test]
    fn crop_clips_partially_visible_region() {
        let m = monitor(0, 1920, 1080);
        let region = Rect::new(-100, -50, 200, 100);
        assert_eq!(crop_window(&region, &m, 1920, 1080), Some((0, 0, 200, 100)));
    }

    #[test]
    fn crop_follows_image_scale() {
        let m = monitor(0, 1280, 720);
        let region = Rect::new(100, 100, 200, 200);
        assert_eq!(crop_window(&region, &m, 2560, 1440), Some((200, 200, 200, 200)));
    }

    #[test]
    fn crop_rejects_off_screen_region() {
        let m = monitor(0, 1920, 1080);
        assert_eq!(crop_window(&Rect::new(5000, 0, 5100, 100), &m, 1920, 1080), None);
    }
}
