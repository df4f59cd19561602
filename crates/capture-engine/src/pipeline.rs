//! Encoder and audio file sinks.
//!
//! The recording worker pushes composited frames into a [`VideoSink`] and
//! drained audio samples into an [`AudioSink`]. The GStreamer sinks feed an
//! `appsrc` element; finishing sends EOS and waits for the muxer to
//! finalize the file before tearing the pipeline down.

use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app::AppSrc;

use scenecast_common::error::{ScenecastError, ScenecastResult};
use scenecast_platform_core::Frame;

use crate::audio::AudioFormat;

/// Upper bound on waiting for EOS to propagate when finishing a file.
const EOS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Destination for composited video frames.
pub trait VideoSink: Send {
    /// Append one frame at presentation time `pts` (paused time excluded).
    fn write_frame(&mut self, frame: &Frame, pts: Duration) -> ScenecastResult<()>;

    /// Flush and finalize the output file.
    fn finish(self: Box<Self>) -> ScenecastResult<()>;
}

/// Destination for interleaved `f32` audio samples.
pub trait AudioSink: Send {
    fn write_samples(&mut self, samples: &[f32]) -> ScenecastResult<()>;

    fn finish(self: Box<Self>) -> ScenecastResult<()>;
}

/// Video encoder parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Opens sinks for a recording or voice session.
pub trait SinkFactory: Send + Sync {
    fn open_video(&self, path: &Path, format: VideoFormat) -> ScenecastResult<Box<dyn VideoSink>>;

    fn open_audio(&self, path: &Path, format: AudioFormat) -> ScenecastResult<Box<dyn AudioSink>>;
}

/// GStreamer-backed H.264 video and WAV audio sinks.
#[derive(Debug, Default, Clone, Copy)]
pub struct GstSinkFactory;

impl SinkFactory for GstSinkFactory {
    fn open_video(&self, path: &Path, format: VideoFormat) -> ScenecastResult<Box<dyn VideoSink>> {
        Ok(Box::new(GstVideoSink::open(path, format)?))
    }

    fn open_audio(&self, path: &Path, format: AudioFormat) -> ScenecastResult<Box<dyn AudioSink>> {
        Ok(Box::new(GstAudioSink::open(path, format)?))
    }
}

/// An `appsrc`-fed pipeline writing to a file.
struct AppSrcPipeline {
    name: &'static str,
    pipeline: gst::Pipeline,
    src: AppSrc,
    finished: bool,
}

impl AppSrcPipeline {
    fn launch(name: &'static str, launch: &str, caps: gst::Caps) -> ScenecastResult<Self> {
        init_gstreamer()?;

        let pipeline = gst::parse::launch(launch)
            .map_err(|e| ScenecastError::encoder(format!("Failed to build {name} pipeline: {e}")))?
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| ScenecastError::encoder("Launch string did not produce a pipeline"))?;

        let src = pipeline
            .by_name("src")
            .and_then(|e| e.dynamic_cast::<AppSrc>().ok())
            .ok_or_else(|| ScenecastError::encoder(format!("{name} pipeline has no appsrc")))?;
        src.set_caps(Some(&caps));
        src.set_format(gst::Format::Time);
        src.set_is_live(false);
        src.set_block(true);
        src.set_max_bytes(64 * 1024 * 1024);

        // The file is opened on the NULL -> READY transition, so an unwritable
        // path fails here rather than on the first buffer.
        if let Err(e) = pipeline.set_state(gst::State::Playing) {
            let detail = pending_error(&pipeline).unwrap_or_else(|| format!("{e:?}"));
            let _ = pipeline.set_state(gst::State::Null);
            return Err(ScenecastError::encoder(format!(
                "Failed to start {name} pipeline: {detail}"
            )));
        }
        if let Some(detail) = pending_error(&pipeline) {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(ScenecastError::encoder(format!(
                "Failed to start {name} pipeline: {detail}"
            )));
        }

        Ok(Self {
            name,
            pipeline,
            src,
            finished: false,
        })
    }

    fn push(&self, data: Vec<u8>, pts: Duration, duration: Duration) -> ScenecastResult<()> {
        let mut buffer = gst::Buffer::from_mut_slice(data);
        {
            let buffer = buffer.make_mut();
            buffer.set_pts(clock_time(pts));
            buffer.set_duration(clock_time(duration));
        }
        self.src.push_buffer(buffer).map_err(|e| {
            ScenecastError::encoder(format!("{} pipeline rejected buffer: {e:?}", self.name))
        })?;
        Ok(())
    }

    fn finish(&mut self) -> ScenecastResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        if let Err(e) = self.src.end_of_stream() {
            tracing::warn!(pipeline = self.name, error = ?e, "Failed to send EOS; output may be truncated");
        } else {
            drain_until_eos(&self.pipeline, self.name);
        }

        self.pipeline.set_state(gst::State::Null).map_err(|e| {
            ScenecastError::encoder(format!("Failed to stop {} pipeline: {e:?}", self.name))
        })?;
        Ok(())
    }
}

impl Drop for AppSrcPipeline {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.pipeline.set_state(gst::State::Null);
        }
    }
}

/// H.264 encoder writing Matroska or MP4 depending on the file extension.
pub struct GstVideoSink {
    inner: AppSrcPipeline,
    format: VideoFormat,
    frame_duration: Duration,
}

impl GstVideoSink {
    pub fn open(path: &Path, format: VideoFormat) -> ScenecastResult<Self> {
        let fps = format.fps.max(1);
        let caps = gst::Caps::builder("video/x-raw")
            .field("format", "RGBA")
            .field("width", format.width as i32)
            .field("height", format.height as i32)
            .field("framerate", gst::Fraction::new(fps as i32, 1))
            .build();
        let launch = video_launch(path, fps);
        let inner = AppSrcPipeline::launch("video", &launch, caps)?;
        tracing::info!(path = %path.display(), width = format.width, height = format.height, fps, "Video sink opened");
        Ok(Self {
            inner,
            format,
            frame_duration: Duration::from_secs(1) / fps,
        })
    }
}

impl VideoSink for GstVideoSink {
    fn write_frame(&mut self, frame: &Frame, pts: Duration) -> ScenecastResult<()> {
        let data = if frame.dimensions() == (self.format.width, self.format.height) {
            frame.as_raw().clone()
        } else {
            image::imageops::resize(
                frame,
                self.format.width,
                self.format.height,
                image::imageops::FilterType::Triangle,
            )
            .into_raw()
        };
        self.inner.push(data, pts, self.frame_duration)
    }

    fn finish(mut self: Box<Self>) -> ScenecastResult<()> {
        self.inner.finish()
    }
}

/// PCM WAV writer.
pub struct GstAudioSink {
    inner: AppSrcPipeline,
    format: AudioFormat,
    frames_written: u64,
}

impl GstAudioSink {
    pub fn open(path: &Path, format: AudioFormat) -> ScenecastResult<Self> {
        let caps = gst::Caps::builder("audio/x-raw")
            .field("format", "F32LE")
            .field("layout", "interleaved")
            .field("rate", format.sample_rate as i32)
            .field("channels", i32::from(format.channels))
            .build();
        let launch = format!(
            "appsrc name=src ! audioconvert ! wavenc ! filesink location=\"{}\"",
            escape_path(path)
        );
        let inner = AppSrcPipeline::launch("audio", &launch, caps)?;
        tracing::info!(path = %path.display(), rate = format.sample_rate, channels = format.channels, "Audio sink opened");
        Ok(Self {
            inner,
            format,
            frames_written: 0,
        })
    }
}

impl AudioSink for GstAudioSink {
    fn write_samples(&mut self, samples: &[f32]) -> ScenecastResult<()> {
        let channels = u64::from(self.format.channels.max(1));
        let frames = samples.len() as u64 / channels;
        if frames == 0 {
            return Ok(());
        }
        let usable = (frames * channels) as usize;
        let data: Vec<u8> = samples[..usable]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        let rate = u64::from(self.format.sample_rate.max(1));
        let pts = Duration::from_nanos(self.frames_written * 1_000_000_000 / rate);
        let duration = Duration::from_nanos(frames * 1_000_000_000 / rate);
        self.inner.push(data, pts, duration)?;
        self.frames_written += frames;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> ScenecastResult<()> {
        self.inner.finish()
    }
}

/// Muxer element for a container extension; Matroska unless the file is MP4.
pub fn muxer_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "mp4mux",
        _ => "matroskamux",
    }
}

fn video_launch(path: &Path, fps: u32) -> String {
    // Keyframe every two seconds.
    let keyint = fps.saturating_mul(2).max(2);
    format!(
        "appsrc name=src ! queue max-size-buffers=8 ! videoconvert ! x264enc tune=zerolatency speed-preset=veryfast key-int-max={keyint} ! h264parse ! queue max-size-buffers=8 ! {mux} ! filesink location=\"{path}\"",
        mux = muxer_for(path),
        path = escape_path(path),
    )
}

fn clock_time(duration: Duration) -> gst::ClockTime {
    gst::ClockTime::from_nseconds(duration.as_nanos() as u64)
}

/// First error message already posted on the pipeline bus, if any.
fn pending_error(pipeline: &gst::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    while let Some(msg) = bus.pop() {
        if let gst::MessageView::Error(e) = msg.view() {
            return Some(e.error().to_string());
        }
    }
    None
}

fn drain_until_eos(pipeline: &gst::Pipeline, name: &str) {
    let Some(bus) = pipeline.bus() else {
        return;
    };
    let start = Instant::now();
    loop {
        let elapsed = start.elapsed();
        if elapsed >= EOS_DRAIN_TIMEOUT {
            tracing::warn!(pipeline = name, "EOS drain timed out");
            break;
        }
        match bus.timed_pop(clock_time(EOS_DRAIN_TIMEOUT - elapsed)) {
            Some(msg) => match msg.view() {
                gst::MessageView::Eos(_) => {
                    tracing::debug!(pipeline = name, "EOS received; pipeline drained");
                    break;
                }
                gst::MessageView::Error(e) => {
                    tracing::warn!(pipeline = name, error = %e.error(), "Pipeline error during EOS drain");
                    break;
                }
                _ => {}
            },
            None => {
                tracing::warn!(pipeline = name, "EOS drain timed out");
                break;
            }
        }
    }
}

pub(crate) fn init_gstreamer() -> ScenecastResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    match GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string())) {
        Ok(()) => Ok(()),
        Err(e) => Err(ScenecastError::encoder(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}
