//! Placeholder frames substituted for failed or invalid captures.

use image::{Rgba, RgbaImage};

use crate::font::embedded_font;
use crate::transform::black_canvas;

/// Label used when a window rectangle is too small to capture.
pub const INVALID_WINDOW_LABEL: &str = "invalid window size";
/// Label used when no window has been selected.
pub const NO_WINDOW_LABEL: &str = "no window selected";

const LABEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// An opaque black frame.
pub fn black_frame(width: u32, height: u32) -> RgbaImage {
    black_canvas(width, height)
}

/// A black frame with `label` centered in white.
///
/// The label shrinks until it fits the frame width; it is omitted on
/// frames too small for even the smallest glyphs.
pub fn labeled_frame(width: u32, height: u32, label: &str) -> RgbaImage {
    let mut frame = black_canvas(width, height);
    let Some(face) = embedded_font() else {
        return frame;
    };
    let mut px = (frame.height() as f32 / 12.0).clamp(8.0, 48.0);
    let (text_w, text_h) = loop {
        let size = face.text_size(px, label);
        if size.0 <= frame.width() || px <= 8.0 {
            break size;
        }
        px -= 8.0;
    };
    if text_w > frame.width() || text_h > frame.height() {
        return frame;
    }
    let x = ((frame.width() - text_w) / 2) as i32;
    let y = ((frame.height() - text_h) / 2) as i32;
    face.draw(&mut frame, LABEL_COLOR, x, y, px, label);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_frame_has_requested_size() {
        let frame = black_frame(32, 16);
        assert_eq!(frame.dimensions(), (32, 16));
        assert!(frame.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn labeled_frame_contains_label_pixels() {
        let frame = labeled_frame(640, 480, INVALID_WINDOW_LABEL);
        assert_eq!(frame.dimensions(), (640, 480));
        assert!(frame.pixels().any(|p| p[0] > 200 && p[1] > 200 && p[2] > 200));
        // Corners stay black; the label is centered.
        assert_eq!(*frame.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*frame.get_pixel(639, 479), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn tiny_frame_skips_label() {
        let frame = labeled_frame(4, 4, INVALID_WINDOW_LABEL);
        assert_eq!(frame.dimensions(), (4, 4));
        assert!(frame.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }
}
