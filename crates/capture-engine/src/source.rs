//! Frame Source Adapter: one capture call per loop iteration, polymorphic
//! over the scene's active source.
//!
//! Capture failures never escape this layer. They become a black or
//! labeled placeholder frame so the calling loop keeps its cadence.

use std::time::{Duration, Instant};

use scenecast_common::config::WindowCaptureLimits;
use scenecast_common::error::ScenecastError;
use scenecast_platform_core::{CameraStream, CaptureBackend, Frame, Rect};
use scenecast_render_engine::{black_frame, labeled_frame, INVALID_WINDOW_LABEL, NO_WINDOW_LABEL};
use scenecast_scene_model::{Resolution, SourceSelection};

/// Label shown while the camera cannot be opened.
pub const CAMERA_UNAVAILABLE_LABEL: &str = "camera unavailable";

/// Wait before retrying a camera that failed to open.
const CAMERA_RETRY_BACKOFF: Duration = Duration::from_secs(2);
/// Minimum spacing between repeated warnings for the same failure kind.
const WARN_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CameraKey {
    index: u32,
    resolution: Resolution,
}

struct OpenCamera {
    key: CameraKey,
    stream: Box<dyn CameraStream>,
    last_frame: Option<Frame>,
}

/// Per-thread capture front-end over a [`CaptureBackend`].
pub struct FrameSourceAdapter {
    backend: Box<dyn CaptureBackend>,
    limits: WindowCaptureLimits,
    camera: Option<OpenCamera>,
    camera_failed: Option<(CameraKey, Instant)>,
    last_warning: Option<Instant>,
}

impl FrameSourceAdapter {
    pub fn new(backend: Box<dyn CaptureBackend>, limits: WindowCaptureLimits) -> Self {
        Self {
            backend,
            limits,
            camera: None,
            camera_failed: None,
            last_warning: None,
        }
    }

    /// Capture the selected source.
    ///
    /// Real captures come back at the source's native size; placeholders
    /// are sized to `canvas`.
    pub fn capture(&mut self, selection: &SourceSelection, canvas: (u32, u32)) -> Frame {
        if !matches!(selection, SourceSelection::Camera { .. }) {
            self.release_camera();
        }

        match selection {
            SourceSelection::FullScreen => match self.backend.grab_screen(None) {
                Ok(frame) => frame,
                Err(e) => {
                    self.warn_throttled("screen", &e);
                    black_frame(canvas.0, canvas.1)
                }
            },
            SourceSelection::Window { rect } => self.capture_window(*rect, canvas),
            SourceSelection::Camera { index, resolution } => {
                self.capture_camera(CameraKey {
                    index: *index,
                    resolution: *resolution,
                }, canvas)
            }
        }
    }

    fn capture_window(&mut self, rect: Option<Rect>, canvas: (u32, u32)) -> Frame {
        let Some(rect) = rect else {
            return labeled_frame(canvas.0, canvas.1, NO_WINDOW_LABEL);
        };
        if rect.is_smaller_than(self.limits.min_width, self.limits.min_height) {
            tracing::trace!(?rect, "Window rectangle below minimum size");
            return labeled_frame(canvas.0, canvas.1, INVALID_WINDOW_LABEL);
        }

        let region = rect.clamp_size(self.limits.max_width, self.limits.max_height);
        match self.backend.grab_screen(Some(region)) {
            Ok(frame) => frame,
            Err(e) => {
                self.warn_throttled("window", &e);
                black_frame(canvas.0, canvas.1)
            }
        }
    }

    fn capture_camera(&mut self, key: CameraKey, canvas: (u32, u32)) -> Frame {
        if self.camera.as_ref().is_some_and(|open| open.key != key) {
            tracing::info!(index = key.index, "Camera settings changed; reopening");
            self.release_camera();
        }

        if self.camera.is_none() {
            if let Some((failed, at)) = self.camera_failed {
                if failed == key && at.elapsed() < CAMERA_RETRY_BACKOFF {
                    return labeled_frame(canvas.0, canvas.1, CAMERA_UNAVAILABLE_LABEL);
                }
            }
            match self
                .backend
                .open_camera(key.index, key.resolution.width, key.resolution.height)
            {
                Ok(stream) => {
                    self.camera_failed = None;
                    self.camera = Some(OpenCamera {
                        key,
                        stream,
                        last_frame: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(index = key.index, error = %e, "Failed to open camera");
                    self.camera_failed = Some((key, Instant::now()));
                    return labeled_frame(canvas.0, canvas.1, CAMERA_UNAVAILABLE_LABEL);
                }
            }
        }

        let Some(open) = self.camera.as_mut() else {
            return black_frame(canvas.0, canvas.1);
        };
        match open.stream.read_frame() {
            Ok(Some(frame)) => {
                open.last_frame = Some(frame.clone());
                frame
            }
            // No new frame yet: keep showing the last one.
            Ok(None) => open
                .last_frame
                .clone()
                .unwrap_or_else(|| black_frame(canvas.0, canvas.1)),
            Err(e) => {
                self.warn_throttled("camera", &e);
                black_frame(canvas.0, canvas.1)
            }
        }
    }

    /// Close the camera handle, if one is open.
    pub fn release_camera(&mut self) {
        if let Some(open) = self.camera.take() {
            tracing::debug!(index = open.key.index, "Releasing camera");
        }
    }

    pub fn has_open_camera(&self) -> bool {
        self.camera.is_some()
    }

    fn warn_throttled(&mut self, source: &str, error: &ScenecastError) {
        let now = Instant::now();
        if self
            .last_warning
            .map_or(true, |last| now.duration_since(last) >= WARN_INTERVAL)
        {
            tracing::warn!(source, error = %error, "Capture failed; substituting placeholder");
            self.last_warning = Some(now);
        } else {
            tracing::debug!(source, error = %error, "Capture failed");
        }
    }
}

impl Drop for FrameSourceAdapter {
    fn drop(&mut self) {
        self.release_camera();
        tracing::debug!("Capture backend closed");
    }
}
