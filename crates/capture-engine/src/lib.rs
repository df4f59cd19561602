//! SceneCast Capture Engine
//!
//! Turns the active scene into pixels and files. A preview worker feeds
//! the UI through a one-frame slot; a recording worker feeds a GStreamer
//! encoder at a fixed frame rate; an optional audio input is written to
//! a WAV beside the video.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!                  │  SceneStore  │  (snapshot per iteration)
//!                  └──────┬───────┘
//!            ┌────────────┴─────────────┐
//!            ▼                          ▼
//!   ┌─────────────────┐       ┌──────────────────┐
//!   │ Preview worker  │       │ Recording worker │
//!   │ source ► compose│       │ source ► compose │
//!   └────────┬────────┘       └───┬──────────┬───┘
//!            ▼                    ▼          ▼
//!      FrameSlot (1)         VideoSink   AudioSink ◄── SampleQueue ◄── mic
//!            │               (mkv/mp4)    (wav)
//!            ▼
//!      PreviewSurface
//! ```
//!
//! [`Studio`] wires these together for a front-end.

pub mod audio;
pub mod backend;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod session;
pub mod slot;
pub mod source;
pub mod studio;
pub mod voice;

pub use audio::{AudioFormat, AudioInput, AudioInputFactory, CpalInputFactory, SampleQueue};
pub use pipeline::{AudioSink, GstSinkFactory, SinkFactory, VideoFormat, VideoSink};
pub use preview::*;
pub use session::*;
pub use studio::*;
pub use voice::*;
