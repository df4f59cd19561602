//! Preview Pipeline: a best-effort, low-latency composite of the active
//! scene, produced on its own thread and handed to the UI through a
//! single-slot channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use scenecast_common::clock::RateController;
use scenecast_common::config::{AppConfig, WindowCaptureLimits};
use scenecast_common::error::{ScenecastError, ScenecastResult};
use scenecast_common::thread::join_with_timeout;
use scenecast_platform_core::{BackendFactory, Frame};
use scenecast_render_engine::{compose_frame, CanvasSpec};
use scenecast_scene_model::SceneStore;

use crate::session::RecordingStatus;
use crate::slot::{frame_slot, SlotReceiver, SlotSender};
use crate::source::FrameSourceAdapter;

/// Preview canvas and cadence.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Preview canvas size.
    pub canvas: (u32, u32),
    /// Canvas the scene's coordinates refer to (the recording canvas).
    pub reference: (u32, u32),
    /// Producer period.
    pub interval: Duration,
    pub window_limits: WindowCaptureLimits,
    pub join_timeout: Duration,
}

impl PreviewConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            canvas: (config.preview.width, config.preview.height),
            reference: (config.recording.width, config.recording.height),
            interval: Duration::from_millis(config.preview.interval_ms.max(1)),
            window_limits: config.window_capture,
            join_timeout: config.shutdown_timeout(),
        }
    }

    pub fn canvas_spec(&self) -> CanvasSpec {
        CanvasSpec::scaled(self.canvas.0, self.canvas.1, self.reference)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

/// Running preview producer.
pub struct PreviewPipeline {
    running: Arc<AtomicBool>,
    frames_produced: Arc<AtomicU64>,
    receiver: SlotReceiver<Frame>,
    worker: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl PreviewPipeline {
    /// Spawn the preview thread.
    pub fn start(
        config: PreviewConfig,
        store: Arc<SceneStore>,
        backends: Arc<dyn BackendFactory>,
        status: RecordingStatus,
    ) -> ScenecastResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let frames_produced = Arc::new(AtomicU64::new(0));
        let (sender, receiver) = frame_slot();

        let worker = PreviewWorker {
            running: running.clone(),
            frames_produced: frames_produced.clone(),
            sender,
            store,
            backends,
            status,
            config: config.clone(),
        };
        let handle = std::thread::Builder::new()
            .name("scenecast-preview".into())
            .spawn(move || worker.run())
            .map_err(|e| ScenecastError::capture(format!("Failed to spawn preview worker: {e}")))?;

        tracing::info!(
            width = config.canvas.0,
            height = config.canvas.1,
            interval_ms = config.interval.as_millis() as u64,
            "Preview started"
        );
        Ok(Self {
            running,
            frames_produced,
            receiver,
            worker: Some(handle),
            join_timeout: config.join_timeout,
        })
    }

    /// A consumer handle for the UI.
    pub fn receiver(&self) -> SlotReceiver<Frame> {
        self.receiver.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn frames_produced(&self) -> u64 {
        self.frames_produced.load(Ordering::Relaxed)
    }

    /// Stop the producer, waiting a bounded time for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            if join_with_timeout(handle, self.join_timeout, "preview").is_some() {
                tracing::info!("Preview stopped");
            }
        }
    }
}

impl Drop for PreviewPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

struct PreviewWorker {
    running: Arc<AtomicBool>,
    frames_produced: Arc<AtomicU64>,
    sender: SlotSender<Frame>,
    store: Arc<SceneStore>,
    backends: Arc<dyn BackendFactory>,
    status: RecordingStatus,
    config: PreviewConfig,
}

impl PreviewWorker {
    fn run(self) {
        let mut adapter = match self.backends.create() {
            Ok(backend) => Some(FrameSourceAdapter::new(backend, self.config.window_limits)),
            Err(e) => {
                tracing::warn!(error = %e, "Preview backend unavailable; showing overlays only");
                None
            }
        };
        let canvas = self.config.canvas_spec();
        let mut rate = RateController::new(self.config.interval);

        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if !rate.should_tick(now) {
                std::thread::sleep(rate.until_next(now));
                continue;
            }

            let book = self.store.snapshot();
            let scene = book.active_scene();
            let captured = match (adapter.as_mut(), scene.selection()) {
                (Some(adapter), Some(selection)) => Some(adapter.capture(&selection, canvas.size())),
                _ => None,
            };
            let frame = compose_frame(captured.as_ref(), scene, &canvas, self.status.badge());
            self.sender.publish(frame);
            self.frames_produced.fetch_add(1, Ordering::Relaxed);
        }

        // Close the capture handles on the thread that opened them.
        drop(adapter);
    }
}

/// UI-side view of the preview: keeps showing the last frame until a
/// newer one arrives.
pub struct PreviewSurface {
    receiver: SlotReceiver<Frame>,
    current: Option<Frame>,
    updates: u64,
}

impl PreviewSurface {
    pub fn new(receiver: SlotReceiver<Frame>) -> Self {
        Self {
            receiver,
            current: None,
            updates: 0,
        }
    }

    /// Take at most one waiting frame. Returns true if the image changed.
    pub fn poll(&mut self) -> bool {
        match self.receiver.take() {
            Some(frame) => {
                self.current = Some(frame);
                self.updates += 1;
                true
            }
            None => false,
        }
    }

    /// The image currently shown.
    pub fn current(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    /// Number of frames shown so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn surface_keeps_last_frame_when_empty() {
        let (tx, rx) = frame_slot();
        let mut surface = PreviewSurface::new(rx);
        assert!(!surface.poll());
        assert!(surface.current().is_none());

        tx.publish(Frame::from_pixel(2, 2, Rgba([1, 2, 3, 255])));
        assert!(surface.poll());
        assert!(!surface.poll());
        assert_eq!(surface.current().map(|f| f.dimensions()), Some((2, 2)));
        assert_eq!(surface.updates(), 1);
    }

    #[test]
    fn config_scales_against_recording_canvas() {
        let config = PreviewConfig::default();
        assert_eq!(config.canvas, (640, 480));
        assert_eq!(config.reference, (1920, 1080));
        assert_eq!(config.interval, Duration::from_millis(33));
        let spec = config.canvas_spec();
        assert!((spec.layout().x - 640.0 / 1920.0).abs() < 1e-9);
    }
}
