//! Audio input capture.
//!
//! The platform audio callback runs off our threads; it only copies the
//! delivered buffer into a [`SampleQueue`]. Consumers drain the queue at
//! their own cadence.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{unbounded, Receiver, Sender};

use scenecast_common::error::{ScenecastError, ScenecastResult};

/// Interleaved sample layout of an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Thread-safe queue of interleaved `f32` sample buffers.
#[derive(Debug, Clone)]
pub struct SampleQueue {
    tx: Sender<Vec<f32>>,
    rx: Receiver<Vec<f32>>,
}

impl Default for SampleQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Enqueue one callback buffer. Never blocks.
    pub fn push(&self, samples: Vec<f32>) {
        let _ = self.tx.send(samples);
    }

    /// Take everything queued so far, concatenated in arrival order.
    pub fn drain(&self) -> Vec<f32> {
        let mut out = Vec::new();
        for chunk in self.rx.try_iter() {
            out.extend_from_slice(&chunk);
        }
        out
    }

    /// Drop everything queued so far, returning the sample count discarded.
    pub fn clear(&self) -> usize {
        self.rx.try_iter().map(|chunk| chunk.len()).sum()
    }
}

/// An open input stream. Dropping it stops capture.
///
/// Not `Send`: some platform streams must stay on the thread that opened them.
pub trait AudioInput {
    /// The format actually negotiated with the device.
    fn format(&self) -> AudioFormat;
}

/// Opens input streams that feed a [`SampleQueue`].
pub trait AudioInputFactory: Send + Sync {
    fn open(&self, requested: AudioFormat, queue: SampleQueue) -> ScenecastResult<Box<dyn AudioInput>>;
}

/// Default input device through `cpal`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalInputFactory;

struct CpalInput {
    _stream: Stream,
    format: AudioFormat,
}

impl AudioInput for CpalInput {
    fn format(&self) -> AudioFormat {
        self.format
    }
}

impl AudioInputFactory for CpalInputFactory {
    fn open(&self, requested: AudioFormat, queue: SampleQueue) -> ScenecastResult<Box<dyn AudioInput>> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| ScenecastError::audio("No audio input device available"))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".into());

        let (config, sample_format) = negotiate(&device, requested)?;
        let format = AudioFormat {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        };
        if format != requested {
            tracing::info!(
                device = %device_name,
                requested_rate = requested.sample_rate,
                requested_channels = requested.channels,
                rate = format.sample_rate,
                channels = format.channels,
                "Audio device does not support requested format; using device default"
            );
        }

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, queue),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, queue),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, queue),
            SampleFormat::I32 => build_stream::<i32>(&device, &config, queue),
            other => {
                return Err(ScenecastError::audio(format!(
                    "Unsupported sample format: {other:?}"
                )))
            }
        }?;

        stream
            .play()
            .map_err(|e| ScenecastError::audio(format!("Failed to start audio stream: {e}")))?;

        tracing::info!(device = %device_name, rate = format.sample_rate, channels = format.channels, "Audio input opened");
        Ok(Box::new(CpalInput {
            _stream: stream,
            format,
        }))
    }
}

/// Prefer the requested rate and channel count; fall back to the device default.
fn negotiate(device: &cpal::Device, requested: AudioFormat) -> ScenecastResult<(StreamConfig, SampleFormat)> {
    let rate = cpal::SampleRate(requested.sample_rate);
    if let Ok(ranges) = device.supported_input_configs() {
        let mut matching: Vec<_> = ranges
            .filter(|r| {
                r.channels() == requested.channels
                    && r.min_sample_rate() <= rate
                    && rate <= r.max_sample_rate()
            })
            .collect();
        matching.sort_by_key(|r| r.sample_format() != SampleFormat::F32);
        if let Some(range) = matching.into_iter().next() {
            let supported = range.with_sample_rate(rate);
            return Ok((supported.config(), supported.sample_format()));
        }
    }

    let fallback = device
        .default_input_config()
        .map_err(|e| ScenecastError::audio(format!("No default input config: {e}")))?;
    Ok((fallback.config(), fallback.sample_format()))
}

fn build_stream<T>(device: &cpal::Device, config: &StreamConfig, queue: SampleQueue) -> ScenecastResult<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                queue.push(data.iter().map(|s| s.to_sample::<f32>()).collect());
            },
            |err| tracing::warn!(error = %err, "Audio stream error"),
            None,
        )
        .map_err(|e| ScenecastError::audio(format!("Failed to open audio stream: {e}")))
}
