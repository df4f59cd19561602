//! Standalone voice recording to a timestamped WAV file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::Local;

use scenecast_common::config::AppConfig;
use scenecast_common::error::{ScenecastError, ScenecastResult};
use scenecast_common::thread::join_with_timeout;

use crate::audio::{AudioFormat, AudioInput, AudioInputFactory, SampleQueue};
use crate::output::voice_path;
use crate::pipeline::{AudioSink, SinkFactory};

/// How often queued samples are moved into the file.
const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub output_dir: PathBuf,
    pub format: AudioFormat,
    pub join_timeout: Duration,
}

impl VoiceConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            format: AudioFormat {
                sample_rate: config.recording.audio_sample_rate,
                channels: config.recording.audio_channels,
            },
            join_timeout: config.shutdown_timeout(),
        }
    }
}

/// Result of a finished voice recording.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSummary {
    pub path: PathBuf,
    pub samples_written: u64,
    pub duration: Duration,
}

struct ActiveVoice {
    input: Option<Box<dyn AudioInput>>,
    running: Arc<AtomicBool>,
    samples: Arc<AtomicU64>,
    worker: Option<JoinHandle<Box<dyn AudioSink>>>,
    path: PathBuf,
    started: Instant,
}

pub struct VoiceRecorder {
    config: VoiceConfig,
    sinks: Arc<dyn SinkFactory>,
    inputs: Arc<dyn AudioInputFactory>,
    active: Option<ActiveVoice>,
}

impl VoiceRecorder {
    pub fn new(config: VoiceConfig, sinks: Arc<dyn SinkFactory>, inputs: Arc<dyn AudioInputFactory>) -> Self {
        Self {
            config,
            sinks,
            inputs,
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.active
            .as_ref()
            .map(|a| a.started.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.path.as_path())
    }

    /// Open the input device and start writing `voice_<timestamp>.wav`.
    pub fn start(&mut self) -> ScenecastResult<PathBuf> {
        if self.active.is_some() {
            return Err(ScenecastError::invalid_state("Voice recording already in progress"));
        }
        std::fs::create_dir_all(&self.config.output_dir).map_err(|e| {
            ScenecastError::audio(format!(
                "Cannot create output directory {}: {e}",
                self.config.output_dir.display()
            ))
        })?;

        let path = voice_path(&self.config.output_dir, Local::now());
        let queue = SampleQueue::new();
        let input = self.inputs.open(self.config.format, queue.clone())?;
        let mut sink = match self.sinks.open_audio(&path, input.format()) {
            Ok(sink) => sink,
            Err(e) => {
                drop(input);
                if path.exists() {
                    let _ = std::fs::remove_file(&path);
                }
                return Err(e);
            }
        };

        let running = Arc::new(AtomicBool::new(true));
        let samples = Arc::new(AtomicU64::new(0));
        let worker = {
            let running = running.clone();
            let samples = samples.clone();
            std::thread::Builder::new()
                .name("scenecast-voice".into())
                .spawn(move || {
                    while running.load(Ordering::Acquire) {
                        std::thread::sleep(DRAIN_INTERVAL);
                        drain_into(&queue, sink.as_mut(), &samples);
                    }
                    drain_into(&queue, sink.as_mut(), &samples);
                    sink
                })
                .map_err(|e| ScenecastError::audio(format!("Failed to spawn voice worker: {e}")))?
        };

        tracing::info!(path = %path.display(), "Voice recording started");
        self.active = Some(ActiveVoice {
            input: Some(input),
            running,
            samples,
            worker: Some(worker),
            path: path.clone(),
            started: Instant::now(),
        });
        Ok(path)
    }

    /// Stop capture, flush the queue, and finalize the file.
    pub fn stop(&mut self) -> ScenecastResult<VoiceSummary> {
        let Some(mut active) = self.active.take() else {
            return Err(ScenecastError::invalid_state("Voice recording not active"));
        };

        // Close the device first so the final drain sees every sample.
        drop(active.input.take());
        active.running.store(false, Ordering::Release);

        let sink = active
            .worker
            .take()
            .and_then(|handle| join_with_timeout(handle, self.config.join_timeout, "voice"));
        match sink {
            Some(sink) => {
                if let Err(e) = sink.finish() {
                    tracing::warn!(error = %e, "Failed to finalize voice recording");
                }
            }
            None => tracing::warn!(path = %active.path.display(), "Voice writer did not finish; file may be incomplete"),
        }

        let summary = VoiceSummary {
            path: active.path.clone(),
            samples_written: active.samples.load(Ordering::Acquire),
            duration: active.started.elapsed(),
        };
        tracing::info!(
            path = %summary.path.display(),
            samples = summary.samples_written,
            "Voice recording stopped"
        );
        Ok(summary)
    }
}

impl Drop for VoiceRecorder {
    fn drop(&mut self) {
        if self.active.is_some() {
            let _ = self.stop();
        }
    }
}

fn drain_into(queue: &SampleQueue, sink: &mut dyn AudioSink, counter: &AtomicU64) {
    let samples = queue.drain();
    if samples.is_empty() {
        return;
    }
    match sink.write_samples(&samples) {
        Ok(()) => {
            counter.fetch_add(samples.len() as u64, Ordering::AcqRel);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to write voice samples"),
    }
}
