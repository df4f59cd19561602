//! Recording session management.
//!
//! `Idle → Recording → (Paused ⇄ Recording) → Idle`. The worker thread
//! captures, composites, and encodes at the target frame rate while
//! recording; while paused it writes nothing, so the file skips paused
//! time exactly like the elapsed counter does.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Local;

use scenecast_common::clock::RecordingClock;
use scenecast_common::config::{AppConfig, WindowCaptureLimits};
use scenecast_common::error::{ScenecastError, ScenecastResult};
use scenecast_common::thread::join_with_timeout;
use scenecast_platform_core::BackendFactory;
use scenecast_render_engine::{compose_frame, CanvasSpec, RecordingBadge};
use scenecast_scene_model::SceneStore;

use crate::audio::{AudioFormat, AudioInput, AudioInputFactory, SampleQueue};
use crate::output::{recording_path, sidecar_audio_path};
use crate::pipeline::{AudioSink, SinkFactory, VideoFormat, VideoSink};
use crate::source::FrameSourceAdapter;

/// Worker poll interval while paused or waiting for the next frame slot.
const WORKER_POLL: Duration = Duration::from_millis(5);
/// Longest backlog filled with repeated frames; older slots are skipped.
const MAX_CATCH_UP: Duration = Duration::from_secs(1);

/// Configuration for recording sessions.
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Directory recordings are written to.
    pub output_dir: PathBuf,

    /// Encoder canvas and frame rate.
    pub video: VideoFormat,

    /// Container extension (`mkv`, `mp4`).
    pub container: String,

    /// Requested audio input format.
    pub audio: AudioFormat,

    pub window_limits: WindowCaptureLimits,

    /// Bounded wait for the worker on stop.
    pub join_timeout: Duration,
}

impl RecordingConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            video: VideoFormat {
                width: config.recording.width,
                height: config.recording.height,
                fps: config.recording.fps,
            },
            container: config.recording.container.clone(),
            audio: AudioFormat {
                sample_rate: config.recording.audio_sample_rate,
                channels: config.recording.audio_channels,
            },
            window_limits: config.window_capture,
            join_timeout: config.shutdown_timeout(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

/// State of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Paused,
}

/// Recording flags shared with the preview for badge burn-in.
#[derive(Debug, Clone, Default)]
pub struct RecordingStatus {
    recording: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl RecordingStatus {
    pub fn badge(&self) -> Option<RecordingBadge> {
        RecordingBadge::from_flags(
            self.recording.load(Ordering::Acquire),
            self.paused.load(Ordering::Acquire),
        )
    }

    fn set(&self, state: RecordingState) {
        self.paused
            .store(state == RecordingState::Paused, Ordering::Release);
        self.recording
            .store(state != RecordingState::Idle, Ordering::Release);
    }
}

/// What a finished recording produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    pub video_path: PathBuf,
    /// Audio sidecar, when the scene had audio enabled.
    pub audio_path: Option<PathBuf>,
    pub frames_written: u64,
    /// Active (non-paused) recording time.
    pub elapsed: Duration,
}

struct SinkSet {
    video: Box<dyn VideoSink>,
    audio: Option<Box<dyn AudioSink>>,
}

/// State shared between the session and its worker.
struct Shared {
    stop: AtomicBool,
    paused: AtomicBool,
    clock: Mutex<RecordingClock>,
    frames_written: AtomicU64,
    sinks: Mutex<Option<SinkSet>>,
}

impl Shared {
    fn active_elapsed(&self) -> Duration {
        lock(&self.clock).active_elapsed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ActiveRecording {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    audio_input: Option<Box<dyn AudioInput>>,
    audio_queue: Option<SampleQueue>,
    video_path: PathBuf,
    audio_path: Option<PathBuf>,
}

/// Drives one recording at a time for the active scene.
pub struct RecordingSession {
    config: RecordingConfig,
    store: Arc<SceneStore>,
    backends: Arc<dyn BackendFactory>,
    sinks: Arc<dyn SinkFactory>,
    audio_inputs: Arc<dyn AudioInputFactory>,
    status: RecordingStatus,
    active: Option<ActiveRecording>,
}

impl RecordingSession {
    pub fn new(
        config: RecordingConfig,
        store: Arc<SceneStore>,
        backends: Arc<dyn BackendFactory>,
        sinks: Arc<dyn SinkFactory>,
        audio_inputs: Arc<dyn AudioInputFactory>,
    ) -> Self {
        Self {
            config,
            store,
            backends,
            sinks,
            audio_inputs,
            status: RecordingStatus::default(),
            active: None,
        }
    }

    /// Flags for the preview badge.
    pub fn status(&self) -> RecordingStatus {
        self.status.clone()
    }

    pub fn state(&self) -> RecordingState {
        match &self.active {
            None => RecordingState::Idle,
            Some(active) if active.shared.paused.load(Ordering::Acquire) => RecordingState::Paused,
            Some(_) => RecordingState::Recording,
        }
    }

    /// Active recording time so far, zero when idle.
    pub fn elapsed(&self) -> Duration {
        self.active
            .as_ref()
            .map(|a| a.shared.active_elapsed())
            .unwrap_or(Duration::ZERO)
    }

    pub fn frames_written(&self) -> u64 {
        self.active
            .as_ref()
            .map(|a| a.shared.frames_written.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Output file of the recording in progress.
    pub fn output_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.video_path.as_path())
    }

    /// Start recording the active scene.
    ///
    /// Any failure to open an output leaves the session idle with no
    /// partial files behind.
    pub fn start(&mut self) -> ScenecastResult<PathBuf> {
        if self.active.is_some() {
            return Err(ScenecastError::invalid_state("Recording already in progress"));
        }

        let scene = self.store.active_scene();
        std::fs::create_dir_all(&self.config.output_dir).map_err(|e| {
            ScenecastError::encoder(format!(
                "Cannot create output directory {}: {e}",
                self.config.output_dir.display()
            ))
        })?;

        let video_path = recording_path(&self.config.output_dir, &self.config.container, Local::now());
        let video = self
            .sinks
            .open_video(&video_path, self.config.video)
            .map_err(|e| {
                remove_partial(&video_path);
                e
            })?;

        let mut audio_input = None;
        let mut audio_queue = None;
        let mut audio_sink = None;
        let mut audio_path = None;
        if scene.audio_enabled {
            let queue = SampleQueue::new();
            let input = match self.audio_inputs.open(self.config.audio, queue.clone()) {
                Ok(input) => input,
                Err(e) => {
                    abandon_video(video, &video_path);
                    return Err(e);
                }
            };
            let path = sidecar_audio_path(&video_path);
            let sink = match self.sinks.open_audio(&path, input.format()) {
                Ok(sink) => sink,
                Err(e) => {
                    drop(input);
                    remove_partial(&path);
                    abandon_video(video, &video_path);
                    return Err(e);
                }
            };
            audio_input = Some(input);
            audio_queue = Some(queue);
            audio_sink = Some(sink);
            audio_path = Some(path);
        }

        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            clock: Mutex::new(RecordingClock::start()),
            frames_written: AtomicU64::new(0),
            sinks: Mutex::new(Some(SinkSet {
                video,
                audio: audio_sink,
            })),
        });

        let worker = RecordingWorker {
            shared: shared.clone(),
            store: self.store.clone(),
            backends: self.backends.clone(),
            status: self.status.clone(),
            audio_queue: audio_queue.clone(),
            video: self.config.video,
            limits: self.config.window_limits,
        };
        let handle = std::thread::Builder::new()
            .name("scenecast-recording".into())
            .spawn(move || worker.run());
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                drop(audio_input);
                if let Some(set) = lock(&shared.sinks).take() {
                    abandon_video(set.video, &video_path);
                }
                if let Some(path) = &audio_path {
                    remove_partial(path);
                }
                return Err(ScenecastError::encoder(format!(
                    "Failed to spawn recording worker: {e}"
                )));
            }
        };

        self.status.set(RecordingState::Recording);
        tracing::info!(
            path = %video_path.display(),
            audio = audio_path.is_some(),
            width = self.config.video.width,
            height = self.config.video.height,
            fps = self.config.video.fps,
            "Recording started"
        );

        self.active = Some(ActiveRecording {
            shared,
            worker: Some(handle),
            audio_input,
            audio_queue,
            video_path: video_path.clone(),
            audio_path,
        });
        Ok(video_path)
    }

    /// Pause recording; the worker stops writing until resumed.
    pub fn pause(&mut self) -> ScenecastResult<()> {
        let active = match (&self.active, self.state()) {
            (Some(active), RecordingState::Recording) => active,
            _ => return Err(ScenecastError::invalid_state("Not recording")),
        };
        lock(&active.shared.clock).pause();
        active.shared.paused.store(true, Ordering::Release);
        self.status.set(RecordingState::Paused);
        tracing::info!("Recording paused");
        Ok(())
    }

    /// Resume a paused recording.
    pub fn resume(&mut self) -> ScenecastResult<()> {
        let active = match (&self.active, self.state()) {
            (Some(active), RecordingState::Paused) => active,
            _ => return Err(ScenecastError::invalid_state("Not paused")),
        };
        let paused_for = lock(&active.shared.clock).resume();
        active.shared.paused.store(false, Ordering::Release);
        self.status.set(RecordingState::Recording);
        tracing::info!(paused_ms = paused_for.map(|d| d.as_millis() as u64), "Recording resumed");
        Ok(())
    }

    /// Stop recording and finalize the output files.
    ///
    /// Shutdown problems (slow worker, finalize errors) are logged, not
    /// returned; the session is idle afterwards either way.
    pub fn stop(&mut self) -> ScenecastResult<RecordingSummary> {
        let Some(mut active) = self.active.take() else {
            return Err(ScenecastError::invalid_state("Not recording"));
        };

        let shared = active.shared.clone();
        shared.stop.store(true, Ordering::Release);
        let elapsed = shared.active_elapsed();
        let was_paused = shared.paused.load(Ordering::Acquire);

        let joined = active
            .worker
            .take()
            .and_then(|handle| join_with_timeout(handle, self.config.join_timeout, "recording"))
            .is_some();

        if let Some(input) = active.audio_input.take() {
            drop(input);
            tracing::debug!("Audio input closed");
        }

        let sinks = if joined {
            lock(&shared.sinks).take()
        } else {
            match shared.sinks.try_lock() {
                Ok(mut guard) => guard.take(),
                Err(_) => {
                    tracing::warn!("Recording worker still holds the encoder; output may be incomplete");
                    None
                }
            }
        };

        if let Some(mut set) = sinks {
            if let (Some(queue), Some(audio)) = (&active.audio_queue, set.audio.as_mut()) {
                let tail = queue.drain();
                if !was_paused && !tail.is_empty() {
                    if let Err(e) = audio.write_samples(&tail) {
                        tracing::warn!(error = %e, "Failed to write final audio samples");
                    }
                }
            }
            if let Err(e) = set.video.finish() {
                tracing::warn!(error = %e, "Failed to finalize video");
            }
            if let Some(audio) = set.audio {
                if let Err(e) = audio.finish() {
                    tracing::warn!(error = %e, "Failed to finalize audio");
                }
            }
        }

        self.status.set(RecordingState::Idle);
        let summary = RecordingSummary {
            video_path: active.video_path.clone(),
            audio_path: active.audio_path.clone(),
            frames_written: shared.frames_written.load(Ordering::Acquire),
            elapsed,
        };
        tracing::info!(
            path = %summary.video_path.display(),
            frames = summary.frames_written,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Recording stopped"
        );
        Ok(summary)
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.active.is_some() {
            tracing::warn!("Recording session dropped while active; stopping");
            let _ = self.stop();
        }
    }
}

fn remove_partial(path: &Path) {
    if path.exists() {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed partial output"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
        }
    }
}

/// Tear down a video sink from a failed start and delete its file.
fn abandon_video(video: Box<dyn VideoSink>, path: &Path) {
    drop(video);
    remove_partial(path);
}

/// Everything the worker thread owns.
struct RecordingWorker {
    shared: Arc<Shared>,
    store: Arc<SceneStore>,
    backends: Arc<dyn BackendFactory>,
    status: RecordingStatus,
    audio_queue: Option<SampleQueue>,
    video: VideoFormat,
    limits: WindowCaptureLimits,
}

impl RecordingWorker {
    fn run(self) {
        // The backend is created on this thread and never leaves it.
        let mut adapter = match self.backends.create() {
            Ok(backend) => Some(FrameSourceAdapter::new(backend, self.limits)),
            Err(e) => {
                tracing::warn!(error = %e, "Recording backend unavailable; writing black frames");
                None
            }
        };

        let canvas = CanvasSpec::native(self.video.width, self.video.height);
        let period = Duration::from_secs(1) / self.video.fps.max(1);
        let max_backlog = (MAX_CATCH_UP.as_nanos() / period.as_nanos().max(1)).max(1) as u64;
        let mut slot: u64 = 0;

        while !self.shared.stop.load(Ordering::Acquire) {
            if self.shared.paused.load(Ordering::Acquire) {
                if let Some(queue) = &self.audio_queue {
                    queue.clear();
                }
                std::thread::sleep(WORKER_POLL);
                continue;
            }

            let active = self.shared.active_elapsed();
            let due = slot_time(period, slot);
            if active < due {
                std::thread::sleep((due - active).min(WORKER_POLL));
                continue;
            }

            let book = self.store.snapshot();
            let scene = book.active_scene();
            let captured = match (adapter.as_mut(), scene.selection()) {
                (Some(adapter), Some(selection)) => Some(adapter.capture(&selection, canvas.size())),
                _ => None,
            };
            let frame = compose_frame(captured.as_ref(), scene, &canvas, self.status.badge());

            let active = self.shared.active_elapsed();
            let behind = active.as_nanos() / period.as_nanos().max(1);
            let last_due = u64::try_from(behind).unwrap_or(u64::MAX);
            if last_due.saturating_sub(slot) > max_backlog {
                let skipped = last_due - slot - max_backlog;
                tracing::warn!(skipped, "Recording fell behind; skipping frame slots");
                slot += skipped;
            }

            let mut guard = lock(&self.shared.sinks);
            let Some(sinks) = guard.as_mut() else {
                break;
            };
            // Fill every slot that is due with the latest composite.
            while slot <= last_due {
                match sinks.video.write_frame(&frame, slot_time(period, slot)) {
                    Ok(()) => {
                        self.shared.frames_written.fetch_add(1, Ordering::AcqRel);
                    }
                    Err(e) => tracing::warn!(error = %e, slot, "Failed to write frame"),
                }
                slot += 1;
            }
            if let (Some(queue), Some(audio)) = (&self.audio_queue, sinks.audio.as_mut()) {
                let samples = queue.drain();
                if !samples.is_empty() {
                    if let Err(e) = audio.write_samples(&samples) {
                        tracing::warn!(error = %e, "Failed to write audio samples");
                    }
                }
            }
        }

        drop(adapter);
        tracing::debug!(frames = self.shared.frames_written.load(Ordering::Acquire), "Recording worker exiting");
    }
}

fn slot_time(period: Duration, slot: u64) -> Duration {
    Duration::from_nanos((period.as_nanos() as u64).saturating_mul(slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_badge_tracks_state() {
        let status = RecordingStatus::default();
        assert_eq!(status.badge(), None);
        status.set(RecordingState::Recording);
        assert_eq!(status.badge(), Some(RecordingBadge::Recording));
        status.set(RecordingState::Paused);
        assert_eq!(status.badge(), Some(RecordingBadge::Paused));
        status.set(RecordingState::Idle);
        assert_eq!(status.badge(), None);
    }

    #[test]
    fn slot_times_are_frame_periods() {
        let period = Duration::from_secs(1) / 30;
        assert_eq!(slot_time(period, 0), Duration::ZERO);
        assert_eq!(slot_time(period, 30), Duration::from_nanos(33_333_333 * 30));
    }

    #[test]
    fn config_follows_app_settings() {
        let mut app = AppConfig::default();
        app.recording.fps = 25;
        app.recording.container = "mp4".into();
        app.shutdown_timeout_ms = 500;
        let config = RecordingConfig::from_app(&app);
        assert_eq!(config.video.fps, 25);
        assert_eq!(config.video.width, 1920);
        assert_eq!(config.container, "mp4");
        assert_eq!(config.join_timeout, Duration::from_millis(500));
    }
}
