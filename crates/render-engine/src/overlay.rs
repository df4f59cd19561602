//! Text Overlay Compositor
//!
//! Draws visible text objects onto a frame in z-order (index 0 first).
//! Backgrounds are alpha-composited ("over") before the glyphs, so
//! overlapping translucent boxes blend instead of adding up.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, Blend};
use imageproc::rect::Rect;

use scenecast_scene_model::{LayoutScale, TextExtent, TextObject};

use crate::font::{resolve_font, FontFace};

/// Padding around the text inside its background box, in reference pixels.
const BACKGROUND_PADDING: f64 = 4.0;

/// Return a copy of `frame` with `objects` drawn on top.
pub fn apply_text_overlays(frame: &RgbaImage, objects: &[TextObject], layout: LayoutScale) -> RgbaImage {
    let mut out = frame.clone();
    draw_text_overlays(&mut out, objects, layout);
    out
}

/// Draw `objects` onto `frame` in place.
pub fn draw_text_overlays(frame: &mut RgbaImage, objects: &[TextObject], layout: LayoutScale) {
    for object in objects.iter().filter(|o| o.visible && !o.text.is_empty()) {
        let Some(face) = resolve_font(&object.font_family) else {
            continue;
        };
        draw_text_object(frame, object, &face, layout);
    }
}

/// Area `object` covers on a canvas with the given layout, background included.
///
/// Matches the painted box exactly so clicks land where the text is drawn.
pub fn text_extent(object: &TextObject, layout: LayoutScale) -> TextExtent {
    let Some(face) = resolve_font(&object.font_family) else {
        return TextExtent::at_anchor(0, 0);
    };
    let (w, h) = face.text_size(scaled_font_px(object, layout), &object.text);
    if object.background().is_some() {
        let pad = padding(layout);
        TextExtent {
            dx: -(pad as i32),
            dy: -(pad as i32),
            width: w + 2 * pad,
            height: h + 2 * pad,
        }
    } else {
        TextExtent::at_anchor(w, h)
    }
}

fn scaled_font_px(object: &TextObject, layout: LayoutScale) -> f32 {
    (object.effective_font_size() * layout.size_factor()).max(1.0) as f32
}

fn padding(layout: LayoutScale) -> u32 {
    (BACKGROUND_PADDING * layout.size_factor()).round().max(1.0) as u32
}

fn draw_text_object(frame: &mut RgbaImage, object: &TextObject, face: &FontFace, layout: LayoutScale) {
    let px = scaled_font_px(object, layout);
    let x = (object.x as f64 * layout.x).round() as i32;
    let y = (object.y as f64 * layout.y).round() as i32;

    if let Some((color, alpha)) = object.background() {
        let extent = text_extent(object, layout);
        let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        fill_blended(
            frame,
            x + extent.dx,
            y + extent.dy,
            extent.width,
            extent.height,
            Rgba(color.with_alpha(alpha)),
        );
    }

    face.draw(frame, Rgba(object.font_color.with_alpha(255)), x, y, px, &object.text);
}

fn fill_blended(frame: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
    if width == 0 || height == 0 || color[3] == 0 {
        return;
    }
    let mut canvas = Blend(std::mem::take(frame));
    draw_filled_rect_mut(&mut canvas, Rect::at(x, y).of_size(width, height), color);
    *frame = canvas.0;
}
