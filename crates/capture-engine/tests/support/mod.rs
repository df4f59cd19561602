//! In-memory capture, window, sink, and audio doubles.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{Rgba, RgbaImage};

use scenecast_capture_engine::{
    AudioFormat, AudioInput, AudioInputFactory, AudioSink, SampleQueue, SinkFactory, VideoFormat,
    VideoSink,
};
use scenecast_common::config::AppConfig;
use scenecast_common::error::{ScenecastError, ScenecastResult};
use scenecast_platform_core::{
    BackendFactory, CameraStream, CaptureBackend, Frame, Rect, WindowHandle, WindowInfo,
    WindowProvider,
};

pub const SCREEN_COLOR: Rgba<u8> = Rgba([30, 90, 200, 255]);

/// Small canvases keep compositing cheap.
pub fn test_config(output_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.output_dir = output_dir.to_path_buf();
    config.recording.width = 160;
    config.recording.height = 90;
    config.recording.fps = 30;
    config.preview.width = 80;
    config.preview.height = 45;
    config.preview.interval_ms = 10;
    config.shutdown_timeout_ms = 2000;
    config
}

// ── Capture ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeBackends {
    pub regions: Arc<Mutex<Vec<Option<Rect>>>>,
}

impl BackendFactory for FakeBackends {
    fn create(&self) -> ScenecastResult<Box<dyn CaptureBackend>> {
        Ok(Box::new(FakeBackend {
            regions: self.regions.clone(),
        }))
    }
}

struct FakeBackend {
    regions: Arc<Mutex<Vec<Option<Rect>>>>,
}

impl CaptureBackend for FakeBackend {
    fn grab_screen(&mut self, region: Option<Rect>) -> ScenecastResult<Frame> {
        self.regions.lock().unwrap().push(region);
        let (w, h) = match region {
            Some(rect) => (rect.width(), rect.height()),
            None => (160, 90),
        };
        Ok(RgbaImage::from_pixel(w, h, SCREEN_COLOR))
    }

    fn open_camera(&mut self, _index: u32, _width: u32, _height: u32) -> ScenecastResult<Box<dyn CameraStream>> {
        Err(ScenecastError::camera("no camera in tests"))
    }
}

// ── Windows ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeWindows {
    pub windows: Mutex<Vec<WindowInfo>>,
}

impl FakeWindows {
    pub fn with(windows: Vec<WindowInfo>) -> Self {
        Self {
            windows: Mutex::new(windows),
        }
    }

    pub fn move_window(&self, handle: WindowHandle, rect: Rect) {
        for window in self.windows.lock().unwrap().iter_mut() {
            if window.handle == handle {
                window.rect = rect;
            }
        }
    }
}

pub fn window(handle: WindowHandle, title: &str, rect: Rect) -> WindowInfo {
    WindowInfo {
        handle,
        title: title.to_string(),
        process: "test".to_string(),
        rect,
    }
}

impl WindowProvider for FakeWindows {
    fn enumerate_windows(&self) -> ScenecastResult<Vec<WindowInfo>> {
        Ok(self.windows.lock().unwrap().clone())
    }

    fn window_rect(&self, handle: WindowHandle) -> ScenecastResult<Option<Rect>> {
        Ok(self
            .windows
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.handle == handle)
            .map(|w| w.rect))
    }
}

// ── Sinks ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct VideoLog {
    pub path: PathBuf,
    pub format: Option<VideoFormat>,
    pub pts: Vec<Duration>,
    pub last_frame: Option<Frame>,
    pub rejected: u64,
    pub finished: bool,
}

#[derive(Debug, Default)]
pub struct AudioLog {
    pub path: PathBuf,
    pub format: Option<AudioFormat>,
    pub samples: Vec<f32>,
    pub finished: bool,
}

/// Records everything written; touches the output path like a real encoder.
#[derive(Default)]
pub struct RecordingSinks {
    pub videos: Mutex<Vec<Arc<Mutex<VideoLog>>>>,
    pub audios: Mutex<Vec<Arc<Mutex<AudioLog>>>>,
    pub fail_video: bool,
    pub fail_audio: bool,
    /// Open normally but refuse every frame.
    pub reject_frames: bool,
}

impl RecordingSinks {
    pub fn failing_video() -> Self {
        Self {
            fail_video: true,
            ..Self::default()
        }
    }

    pub fn failing_audio() -> Self {
        Self {
            fail_audio: true,
            ..Self::default()
        }
    }

    pub fn rejecting_frames() -> Self {
        Self {
            reject_frames: true,
            ..Self::default()
        }
    }

    pub fn video(&self, index: usize) -> Arc<Mutex<VideoLog>> {
        self.videos.lock().unwrap()[index].clone()
    }

    pub fn audio(&self, index: usize) -> Arc<Mutex<AudioLog>> {
        self.audios.lock().unwrap()[index].clone()
    }
}

impl SinkFactory for RecordingSinks {
    fn open_video(&self, path: &Path, format: VideoFormat) -> ScenecastResult<Box<dyn VideoSink>> {
        if self.fail_video {
            return Err(ScenecastError::encoder(format!("cannot open {}", path.display())));
        }
        std::fs::write(path, b"").map_err(|e| ScenecastError::encoder(e.to_string()))?;
        let log = Arc::new(Mutex::new(VideoLog {
            path: path.to_path_buf(),
            format: Some(format),
            ..VideoLog::default()
        }));
        self.videos.lock().unwrap().push(log.clone());
        Ok(Box::new(LoggedVideo {
            log,
            reject: self.reject_frames,
        }))
    }

    fn open_audio(&self, path: &Path, format: AudioFormat) -> ScenecastResult<Box<dyn AudioSink>> {
        if self.fail_audio {
            return Err(ScenecastError::audio(format!("cannot open {}", path.display())));
        }
        std::fs::write(path, b"").map_err(|e| ScenecastError::audio(e.to_string()))?;
        let log = Arc::new(Mutex::new(AudioLog {
            path: path.to_path_buf(),
            format: Some(format),
            ..AudioLog::default()
        }));
        self.audios.lock().unwrap().push(log.clone());
        Ok(Box::new(LoggedAudio { log }))
    }
}

struct LoggedVideo {
    log: Arc<Mutex<VideoLog>>,
    reject: bool,
}

impl VideoSink for LoggedVideo {
    fn write_frame(&mut self, frame: &Frame, pts: Duration) -> ScenecastResult<()> {
        let mut log = self.log.lock().unwrap();
        if self.reject {
            log.rejected += 1;
            return Err(ScenecastError::encoder("frame rejected"));
        }
        log.pts.push(pts);
        log.last_frame = Some(frame.clone());
        Ok(())
    }

    fn finish(self: Box<Self>) -> ScenecastResult<()> {
        self.log.lock().unwrap().finished = true;
        Ok(())
    }
}

struct LoggedAudio {
    log: Arc<Mutex<AudioLog>>,
}

impl AudioSink for LoggedAudio {
    fn write_samples(&mut self, samples: &[f32]) -> ScenecastResult<()> {
        self.log.lock().unwrap().samples.extend_from_slice(samples);
        Ok(())
    }

    fn finish(self: Box<Self>) -> ScenecastResult<()> {
        self.log.lock().unwrap().finished = true;
        Ok(())
    }
}

// ── Audio input ──────────────────────────────────────────────────────

/// Delivers one buffer of `burst` samples as soon as it is opened.
pub struct BurstInput {
    pub burst: usize,
    pub fail: bool,
}

impl BurstInput {
    pub fn new(burst: usize) -> Self {
        Self { burst, fail: false }
    }

    pub fn unavailable() -> Self {
        Self { burst: 0, fail: true }
    }
}

impl AudioInputFactory for BurstInput {
    fn open(&self, requested: AudioFormat, queue: SampleQueue) -> ScenecastResult<Box<dyn AudioInput>> {
        if self.fail {
            return Err(ScenecastError::audio("no input device"));
        }
        if self.burst > 0 {
            queue.push(vec![0.25; self.burst]);
        }
        Ok(Box::new(OpenInput { format: requested }))
    }
}

struct OpenInput {
    format: AudioFormat,
}

impl AudioInput for OpenInput {
    fn format(&self) -> AudioFormat {
        self.format
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}

pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    files.sort();
    files
}
