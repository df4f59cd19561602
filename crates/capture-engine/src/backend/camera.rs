//! Camera capture through a GStreamer `appsink`.

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app::AppSink;

use scenecast_common::error::{ScenecastError, ScenecastResult};
use scenecast_platform_core::{CameraStream, Frame};

use crate::pipeline::init_gstreamer;

/// How long a read waits for the next camera sample.
const READ_TIMEOUT_MS: u64 = 50;
/// How long opening waits for the device to start streaming.
const OPEN_TIMEOUT_SECS: u64 = 5;

/// An open camera device delivering RGBA frames at the requested size.
pub struct GstCameraStream {
    index: u32,
    pipeline: gst::Pipeline,
    sink: AppSink,
}

impl GstCameraStream {
    pub fn open(index: u32, width: u32, height: u32) -> ScenecastResult<Self> {
        init_gstreamer()?;

        let launch = camera_launch(index, width.max(1), height.max(1));
        tracing::debug!(index, %launch, "Opening camera");

        let pipeline = gst::parse::launch(&launch)
            .map_err(|e| ScenecastError::camera(format!("Failed to build camera pipeline: {e}")))?
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| ScenecastError::camera("Camera launch did not produce a pipeline"))?;

        let sink = pipeline
            .by_name("camsink")
            .and_then(|e| e.dynamic_cast::<AppSink>().ok())
            .ok_or_else(|| ScenecastError::camera("Camera pipeline has no appsink"))?;

        pipeline.set_state(gst::State::Playing).map_err(|e| {
            let _ = pipeline.set_state(gst::State::Null);
            ScenecastError::camera(format!("Failed to start camera {index}: {e:?}"))
        })?;

        match pipeline.state(gst::ClockTime::from_seconds(OPEN_TIMEOUT_SECS)) {
            (Ok(_), gst::State::Playing, _) => {}
            (Ok(_), state, _) => {
                tracing::warn!(index, ?state, "Camera did not reach Playing state within timeout");
            }
            (Err(e), _, _) => {
                let _ = pipeline.set_state(gst::State::Null);
                return Err(ScenecastError::camera(format!(
                    "Camera {index} failed to start: {e:?}"
                )));
            }
        }

        tracing::info!(index, width, height, "Camera opened");
        Ok(Self {
            index,
            pipeline,
            sink,
        })
    }
}

impl CameraStream for GstCameraStream {
    fn read_frame(&mut self) -> ScenecastResult<Option<Frame>> {
        let Some(sample) = self
            .sink
            .try_pull_sample(gst::ClockTime::from_mseconds(READ_TIMEOUT_MS))
        else {
            if self.sink.is_eos() {
                return Err(ScenecastError::camera(format!(
                    "Camera {} stream ended",
                    self.index
                )));
            }
            return Ok(None);
        };

        let (width, height) = sample
            .caps()
            .and_then(|caps| caps.structure(0))
            .and_then(|s| Some((s.get::<i32>("width").ok()?, s.get::<i32>("height").ok()?)))
            .ok_or_else(|| ScenecastError::camera("Camera sample has no size caps"))?;

        let buffer = sample
            .buffer()
            .ok_or_else(|| ScenecastError::camera("Camera sample has no buffer"))?;
        let map = buffer
            .map_readable()
            .map_err(|_| ScenecastError::camera("Camera buffer is not readable"))?;

        let frame = Frame::from_raw(width as u32, height as u32, map.as_slice().to_vec())
            .ok_or_else(|| ScenecastError::camera("Camera buffer size does not match caps"))?;
        Ok(Some(frame))
    }
}

impl Drop for GstCameraStream {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(index = self.index, error = ?e, "Failed to close camera");
        } else {
            tracing::debug!(index = self.index, "Camera closed");
        }
    }
}

fn camera_source(index: u32) -> String {
    if cfg!(target_os = "windows") {
        format!("ksvideosrc device-index={index}")
    } else if cfg!(target_os = "macos") {
        format!("avfvideosrc device-index={index}")
    } else {
        format!("v4l2src device=/dev/video{index}")
    }
}

fn camera_launch(index: u32, width: u32, height: u32) -> String {
    let source = camera_source(index);
    format!(
        "{source} ! queue max-size-buffers=2 leaky=downstream ! videoconvert ! videoscale ! video/x-raw,format=RGBA,width={width},height={height} ! appsink name=camsink max-buffers=1 drop=true sync=false"
    )
}
