//! REC / PAUSED status badges burned into preview and recorded frames.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;

use crate::font::embedded_font;

const REC_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const PAUSED_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);

/// Recording state as shown on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingBadge {
    Recording,
    Paused,
}

impl RecordingBadge {
    pub fn from_flags(recording: bool, paused: bool) -> Option<Self> {
        match (recording, paused) {
            (false, _) => None,
            (true, false) => Some(RecordingBadge::Recording),
            (true, true) => Some(RecordingBadge::Paused),
        }
    }
}

/// Draw the badge in the top-right corner, scaled to the frame height.
pub fn draw_recording_badge(frame: &mut RgbaImage, badge: RecordingBadge) {
    let Some(face) = embedded_font() else {
        return;
    };
    let px = (frame.height() as f32 / 24.0).clamp(8.0, 48.0);
    let margin = (px * 0.6).round() as i32;
    let (rec_w, rec_h) = face.text_size(px, "REC");
    let radius = (rec_h as i32 / 2).max(2);

    let text_x = frame.width() as i32 - margin - rec_w as i32;
    let dot_x = text_x - radius - margin / 2;
    let dot_y = margin + rec_h as i32 / 2;
    draw_filled_circle_mut(frame, (dot_x, dot_y), radius, REC_COLOR);
    face.draw(frame, REC_COLOR, text_x, margin, px, "REC");

    if badge == RecordingBadge::Paused {
        let (paused_w, _) = face.text_size(px, "PAUSED");
        let x = frame.width() as i32 - margin - paused_w as i32;
        let y = margin + rec_h as i32 + margin / 2;
        face.draw(frame, PAUSED_COLOR, x, y, px, "PAUSED");
    }
}
