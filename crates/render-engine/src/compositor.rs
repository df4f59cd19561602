//! Frame compositor: combines a captured source frame, text overlays,
//! and the recording badge into one canvas.
//!
//! Scene coordinates (transform offsets, text positions) are expressed
//! on a reference canvas, normally the recording resolution. A smaller
//! canvas such as the preview scales them through [`LayoutScale`].

use image::RgbaImage;

use scenecast_scene_model::{LayoutScale, Scene};

use crate::indicator::{draw_recording_badge, RecordingBadge};
use crate::overlay::draw_text_overlays;
use crate::transform::{apply_transform, black_canvas};

/// Output canvas size and the reference canvas scene coordinates use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    pub reference_width: u32,
    pub reference_height: u32,
}

impl CanvasSpec {
    /// A canvas that is its own reference.
    pub fn native(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            reference_width: width,
            reference_height: height,
        }
    }

    /// A canvas drawn at `width` x `height` for scene coordinates on `reference`.
    pub fn scaled(width: u32, height: u32, reference: (u32, u32)) -> Self {
        Self {
            width,
            height,
            reference_width: reference.0,
            reference_height: reference.1,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> LayoutScale {
        LayoutScale::between(self.size(), (self.reference_width, self.reference_height))
    }
}

/// Compose one output frame.
///
/// `captured` is the active source's frame, or `None` when the scene has
/// no enabled source; the canvas is then black with overlays on top.
pub fn compose_frame(
    captured: Option<&RgbaImage>,
    scene: &Scene,
    canvas: &CanvasSpec,
    badge: Option<RecordingBadge>,
) -> RgbaImage {
    let layout = canvas.layout();

    let mut frame = match (captured, scene.active_source()) {
        (Some(source), Some(kind)) => apply_transform(
            source,
            scene.transform(kind),
            kind.anchor(),
            canvas.size(),
            layout,
        ),
        _ => black_canvas(canvas.width, canvas.height),
    };

    draw_text_overlays(&mut frame, &scene.text_objects, layout);

    if let Some(badge) = badge {
        draw_recording_badge(&mut frame, badge);
    }
    frame
}
