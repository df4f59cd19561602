//! Application controller tying the scene store, preview, recording, and
//! voice recorder together for a front-end.
//!
//! Every operation is meant to be called from the UI thread. Failures a
//! user should see are published once on the notification channel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use scenecast_common::clock::format_elapsed;
use scenecast_common::config::AppConfig;
use scenecast_common::error::ScenecastResult;
use scenecast_platform_core::{BackendFactory, Frame, WindowHandle, WindowInfo, WindowProvider};
use scenecast_render_engine::text_extent;
use scenecast_scene_model::{LayoutScale, Scene, SceneBook, SceneStore, SourceKind};

use crate::audio::{AudioInputFactory, CpalInputFactory};
use crate::backend::{native_backend_factory, native_window_provider};
use crate::pipeline::{GstSinkFactory, SinkFactory};
use crate::preview::{PreviewConfig, PreviewPipeline, PreviewSurface};
use crate::session::{RecordingConfig, RecordingSession, RecordingState, RecordingSummary};
use crate::voice::{VoiceConfig, VoiceRecorder, VoiceSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing message (a modal dialog in a GUI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// External collaborators of a [`Studio`].
#[derive(Clone)]
pub struct StudioDeps {
    pub backends: Arc<dyn BackendFactory>,
    pub windows: Arc<dyn WindowProvider>,
    pub sinks: Arc<dyn SinkFactory>,
    pub audio: Arc<dyn AudioInputFactory>,
}

impl StudioDeps {
    /// Native capture, GStreamer sinks, and the default audio input.
    pub fn native() -> Self {
        Self {
            backends: native_backend_factory(),
            windows: native_window_provider(),
            sinks: Arc::new(GstSinkFactory),
            audio: Arc::new(CpalInputFactory),
        }
    }
}

pub struct Studio {
    config: AppConfig,
    store: Arc<SceneStore>,
    deps: StudioDeps,
    recording: RecordingSession,
    voice: VoiceRecorder,
    preview: Option<PreviewPipeline>,
    surface: Option<PreviewSurface>,
    scenes_path: Option<PathBuf>,
    selected_window: Option<WindowHandle>,
    notify_tx: Sender<Notification>,
    notify_rx: Receiver<Notification>,
}

impl Studio {
    pub fn new(config: AppConfig, book: SceneBook, deps: StudioDeps) -> Self {
        let store = Arc::new(SceneStore::new(book));
        let recording = RecordingSession::new(
            RecordingConfig::from_app(&config),
            store.clone(),
            deps.backends.clone(),
            deps.sinks.clone(),
            deps.audio.clone(),
        );
        let voice = VoiceRecorder::new(VoiceConfig::from_app(&config), deps.sinks.clone(), deps.audio.clone());
        let (notify_tx, notify_rx) = unbounded();
        Self {
            config,
            store,
            deps,
            recording,
            voice,
            preview: None,
            surface: None,
            scenes_path: None,
            selected_window: None,
            notify_tx,
            notify_rx,
        }
    }

    /// Persist the scene book to `path` on [`Studio::save_scenes`] and exit.
    pub fn with_scenes_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scenes_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SceneStore> {
        &self.store
    }

    /// Receiver for user-facing notifications.
    pub fn notifications(&self) -> Receiver<Notification> {
        self.notify_rx.clone()
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NotificationLevel::Error => tracing::error!(%message, "Notification"),
            NotificationLevel::Warning => tracing::warn!(%message, "Notification"),
            NotificationLevel::Info => tracing::info!(%message, "Notification"),
        }
        let _ = self.notify_tx.send(Notification { level, message });
    }

    fn report<T>(&self, context: &str, result: ScenecastResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.notify(NotificationLevel::Error, format!("{context}: {e}"));
                None
            }
        }
    }

    // ── Preview ──────────────────────────────────────────────────────

    pub fn start_preview(&mut self) -> bool {
        if self.preview.is_some() {
            return true;
        }
        let started = PreviewPipeline::start(
            PreviewConfig::from_app(&self.config),
            self.store.clone(),
            self.deps.backends.clone(),
            self.recording.status(),
        );
        match self.report("Could not start preview", started) {
            Some(preview) => {
                self.surface = Some(PreviewSurface::new(preview.receiver()));
                self.preview = Some(preview);
                true
            }
            None => false,
        }
    }

    /// UI timer tick: take at most one new preview frame.
    pub fn poll_preview(&mut self) -> bool {
        self.surface.as_mut().is_some_and(|s| s.poll())
    }

    pub fn preview_frame(&self) -> Option<&Frame> {
        self.surface.as_ref().and_then(|s| s.current())
    }

    pub fn stop_preview(&mut self) {
        if let Some(mut preview) = self.preview.take() {
            preview.stop();
        }
    }

    pub fn preview_layout(&self) -> LayoutScale {
        PreviewConfig::from_app(&self.config).canvas_spec().layout()
    }

    // ── Recording ────────────────────────────────────────────────────

    pub fn recording_state(&self) -> RecordingState {
        self.recording.state()
    }

    /// Elapsed active time as `HH:MM:SS`.
    pub fn elapsed_text(&self) -> String {
        format_elapsed(self.recording.elapsed())
    }

    pub fn recording_elapsed(&self) -> Duration {
        self.recording.elapsed()
    }

    pub fn start_recording(&mut self) -> Option<PathBuf> {
        let scene = self.store.active_scene();
        if let Err(e) = scene.validate() {
            self.notify(NotificationLevel::Error, format!("Could not start recording: {e}"));
            return None;
        }
        let started = self.recording.start();
        self.report("Could not start recording", started)
    }

    pub fn pause_recording(&mut self) -> bool {
        let paused = self.recording.pause();
        self.report("Could not pause", paused).is_some()
    }

    pub fn resume_recording(&mut self) -> bool {
        let resumed = self.recording.resume();
        self.report("Could not resume", resumed).is_some()
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.recording.state() {
            RecordingState::Recording => self.pause_recording(),
            RecordingState::Paused => self.resume_recording(),
            RecordingState::Idle => false,
        }
    }

    pub fn stop_recording(&mut self) -> Option<RecordingSummary> {
        let stopped = self.recording.stop();
        let summary = self.report("Could not stop recording", stopped)?;
        let mut message = format!(
            "Recording saved to {} ({}, {} frames)",
            summary.video_path.display(),
            format_elapsed(summary.elapsed),
            summary.frames_written
        );
        if let Some(audio) = &summary.audio_path {
            message.push_str(&format!("; audio in {}", audio.display()));
        }
        self.notify(NotificationLevel::Info, message);
        Some(summary)
    }

    // ── Voice ────────────────────────────────────────────────────────

    pub fn is_voice_recording(&self) -> bool {
        self.voice.is_recording()
    }

    pub fn start_voice(&mut self) -> Option<PathBuf> {
        let started = self.voice.start();
        self.report("Could not start voice recording", started)
    }

    pub fn stop_voice(&mut self) -> Option<VoiceSummary> {
        let stopped = self.voice.stop();
        let summary = self.report("Could not stop voice recording", stopped)?;
        self.notify(
            NotificationLevel::Info,
            format!("Voice recording saved to {}", summary.path.display()),
        );
        Some(summary)
    }

    // ── Windows ──────────────────────────────────────────────────────

    pub fn list_windows(&self) -> Vec<WindowInfo> {
        let windows = self.deps.windows.enumerate_windows();
        self.report("Could not list windows", windows).unwrap_or_default()
    }

    /// Use `handle` as the active scene's window source.
    ///
    /// The rectangle is captured now; it does not follow the window.
    pub fn select_window(&mut self, handle: WindowHandle) -> bool {
        let found = self
            .deps
            .windows
            .enumerate_windows()
            .map(|windows| windows.into_iter().find(|w| w.handle == handle));
        let Some(found) = self.report("Could not list windows", found) else {
            return false;
        };
        let Some(window) = found else {
            self.notify(NotificationLevel::Warning, format!("Window {handle} no longer exists"));
            return false;
        };

        self.store.update_active(|scene| {
            scene.set_window(window.rect, window.title.clone());
            scene.select_source(SourceKind::Window);
        });
        self.selected_window = Some(handle);
        tracing::info!(handle, title = %window.title, rect = ?window.rect, "Window selected");
        true
    }

    /// Re-read the selected window's rectangle into the active scene.
    pub fn refresh_window_rect(&mut self) -> bool {
        let Some(handle) = self.selected_window else {
            return false;
        };
        let rect = self.deps.windows.window_rect(handle);
        match self.report("Could not read window position", rect) {
            Some(Some(rect)) => {
                self.store.update_active(|scene| scene.window_rect = Some(rect));
                true
            }
            Some(None) => {
                self.notify(NotificationLevel::Warning, format!("Window {handle} no longer exists"));
                false
            }
            None => false,
        }
    }

    // ── Scenes ───────────────────────────────────────────────────────

    pub fn active_scene(&self) -> Scene {
        self.store.active_scene()
    }

    /// Edit the active scene; workers see the result on their next iteration.
    pub fn edit_scene<R>(&self, edit: impl FnOnce(&mut Scene) -> R) -> R {
        self.store.update_active(edit)
    }

    pub fn add_scene(&self, name: impl Into<String>) -> usize {
        let name = name.into();
        self.store.update(|book| book.add_scene(name))
    }

    pub fn select_scene(&self, index: usize) -> bool {
        let selected = self.store.update(|book| book.select(index));
        self.report("Could not switch scene", selected).is_some()
    }

    pub fn remove_scene(&self, index: usize) -> bool {
        let removed = self.store.update(|book| book.remove_scene(index));
        self.report("Could not remove scene", removed).is_some()
    }

    pub fn rename_scene(&self, index: usize, name: impl Into<String>) -> bool {
        let name = name.into();
        let renamed = self.store.update(|book| book.rename_scene(index, name));
        self.report("Could not rename scene", renamed).is_some()
    }

    /// Top-most text object under a point on the preview.
    pub fn hit_test_preview(&self, x: f64, y: f64) -> Option<usize> {
        let layout = self.preview_layout();
        self.store
            .snapshot()
            .active_scene()
            .hit_test(x, y, layout, |text| text_extent(text, LayoutScale::IDENTITY))
    }

    /// Move a text object by a drag delta measured on the preview.
    pub fn drag_preview_text(&self, index: usize, dx: f64, dy: f64) -> bool {
        let layout = self.preview_layout();
        self.store.update_active(|scene| scene.drag_text(index, dx, dy, layout))
    }

    pub fn scroll_text(&self, index: usize, steps: i32) -> bool {
        self.store.update_active(|scene| scene.scroll_text(index, steps))
    }

    pub fn save_scenes(&self) -> bool {
        let Some(path) = &self.scenes_path else {
            return true;
        };
        let saved = self.store.snapshot().save(path);
        self.report("Could not save scenes", saved).is_some()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Handle an exit request.
    ///
    /// While recording, `confirm` is asked first; declining keeps
    /// everything running and returns false. Otherwise everything is shut
    /// down and true is returned.
    pub fn request_exit(&mut self, confirm: impl FnOnce() -> bool) -> bool {
        if self.recording.state() != RecordingState::Idle && !confirm() {
            tracing::info!("Exit cancelled; recording continues");
            return false;
        }
        self.shutdown();
        true
    }

    /// Stop everything that is running and persist scenes.
    pub fn shutdown(&mut self) {
        if self.recording.state() != RecordingState::Idle {
            self.stop_recording();
        }
        if self.voice.is_recording() {
            self.stop_voice();
        }
        self.stop_preview();
        self.save_scenes();
        tracing::info!("Studio shut down");
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.stop_preview();
    }
}

