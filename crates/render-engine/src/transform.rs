//! Transform Stage: per-source scale and offset into a fixed-size canvas.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use scenecast_scene_model::{Anchor, LayoutScale, SourceTransform};

/// Opaque black, used for empty canvas areas.
pub const CANVAS_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Resampling filter for all frame resizes.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// A black canvas of the given size.
pub fn black_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width.max(1), height.max(1), CANVAS_BACKGROUND)
}

/// Resize `frame` to exactly `canvas`, skipping the work when it already matches.
pub fn fit_to_canvas(frame: &RgbaImage, canvas: (u32, u32)) -> RgbaImage {
    let (width, height) = (canvas.0.max(1), canvas.1.max(1));
    if frame.dimensions() == (width, height) {
        return frame.clone();
    }
    imageops::resize(frame, width, height, RESIZE_FILTER)
}

/// Place `frame` on a `canvas`-sized buffer according to `transform`.
///
/// Scale and offsets are given on the reference canvas; both are mapped
/// through `layout`, so a smaller canvas shows the same picture. The placement is clamped so the scaled image stays inside the canvas;
/// an image larger than the canvas leaves the canvas black for this frame.
pub fn apply_transform(
    frame: &RgbaImage,
    transform: &SourceTransform,
    anchor: Anchor,
    canvas: (u32, u32),
    layout: LayoutScale,
) -> RgbaImage {
    if transform.is_identity() {
        return fit_to_canvas(frame, canvas);
    }

    let (canvas_w, canvas_h) = (canvas.0.max(1), canvas.1.max(1));
    let mut out = black_canvas(canvas_w, canvas_h);
    if !(transform.scale.is_finite() && transform.scale > 0.0) {
        return out;
    }

    let scaled_w = scaled_len(frame.width(), transform.scale * layout.x);
    let scaled_h = scaled_len(frame.height(), transform.scale * layout.y);
    if scaled_w > canvas_w || scaled_h > canvas_h {
        tracing::trace!(scaled_w, scaled_h, canvas_w, canvas_h, "Scaled source exceeds canvas");
        return out;
    }

    let offset_x = (transform.offset_x as f64 * layout.x).round() as i64;
    let offset_y = (transform.offset_y as f64 * layout.y).round() as i64;
    let (x, y) = placement(
        anchor,
        (offset_x, offset_y),
        (scaled_w, scaled_h),
        (canvas_w, canvas_h),
    );

    if (scaled_w, scaled_h) == frame.dimensions() {
        imageops::replace(&mut out, frame, x, y);
    } else {
        let scaled = imageops::resize(frame, scaled_w, scaled_h, RESIZE_FILTER);
        imageops::replace(&mut out, &scaled, x, y);
    }
    out
}

/// Top-left corner of a `scaled`-sized image on the canvas, clamped to fit.
///
/// The caller guarantees `scaled <= canvas` on both axes.
pub fn placement(
    anchor: Anchor,
    offset: (i64, i64),
    scaled: (u32, u32),
    canvas: (u32, u32),
) -> (i64, i64) {
    let max_x = i64::from(canvas.0) - i64::from(scaled.0);
    let max_y = i64::from(canvas.1) - i64::from(scaled.1);
    let (base_x, base_y) = match anchor {
        Anchor::Origin => offset,
        Anchor::Center => (
            i64::from(canvas.0 / 2) - i64::from(scaled.0 / 2) + offset.0,
            i64::from(canvas.1 / 2) - i64::from(scaled.1 / 2) + offset.1,
        ),
    };
    (base_x.clamp(0, max_x.max(0)), base_y.clamp(0, max_y.max(0)))
}

fn scaled_len(len: u32, scale: f64) -> u32 {
    (len as f64 * scale).round().clamp(1.0, u32::MAX as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn white(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
    }

    fn transform(scale: f64, offset_x: i32, offset_y: i32) -> SourceTransform {
        SourceTransform {
            scale,
            offset_x,
            offset_y,
        }
    }

    #[test]
    fn identity_fast_path_resizes_to_canvas() {
        let out = apply_transform(
            &white(64, 48),
            &SourceTransform::default(),
            Anchor::Origin,
            (32, 24),
            LayoutScale::IDENTITY,
        );
        assert_eq!(out.dimensions(), (32, 24));
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn origin_anchor_places_at_offset() {
        let out = apply_transform(
            &white(100, 100),
            &transform(0.5, 10, 20),
            Anchor::Origin,
            (100, 100),
            LayoutScale::IDENTITY,
        );
        assert_eq!(*out.get_pixel(9, 20), CANVAS_BACKGROUND);
        assert_eq!(*out.get_pixel(10, 20), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(59, 69), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(60, 70), CANVAS_BACKGROUND);
    }

    #[test]
    fn center_anchor_offsets_from_center_and_clamps() {
        assert_eq!(
            placement(Anchor::Center, (0, 0), (50, 50), (100, 100)),
            (25, 25)
        );
        assert_eq!(
            placement(Anchor::Center, (10, -5), (50, 50), (100, 100)),
            (35, 20)
        );
        assert_eq!(
            placement(Anchor::Center, (500, -500), (50, 50), (100, 100)),
            (50, 0)
        );
        assert_eq!(
            placement(Anchor::Origin, (-30, 70), (50, 50), (100, 100)),
            (0, 50)
        );
    }

    #[test]
    fn oversized_image_leaves_canvas_black() {
        let out = apply_transform(
            &white(100, 100),
            &transform(2.0, 0, 0),
            Anchor::Center,
            (100, 100),
            LayoutScale::IDENTITY,
        );
        assert!(out.pixels().all(|p| *p == CANVAS_BACKGROUND));
    }

    #[test]
    fn layout_scales_offsets() {
        let layout = LayoutScale::between((50, 50), (100, 100));
        let out = apply_transform(
            &white(10, 10),
            &transform(0.5, 20, 0),
            Anchor::Origin,
            (50, 50),
            layout,
        );
        // Offset 20 on the reference canvas is 10 on the half-size canvas.
        assert_eq!(*out.get_pixel(9, 0), CANVAS_BACKGROUND);
        assert_eq!(*out.get_pixel(10, 0), Rgba([255, 255, 255, 255]));
        // A 10px source at 0.5 covers 5 reference pixels, so 2.5 -> 3 here.
        assert_eq!(*out.get_pixel(12, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(13, 0), CANVAS_BACKGROUND);
    }

    #[test]
    fn layout_scales_source_size() {
        // A full-size source at 0.5 fits the reference canvas and must fit
        // the smaller canvas too instead of overflowing it.
        let layout = LayoutScale::between((640, 480), (1920, 1080));
        let out = apply_transform(
            &white(1920, 1080),
            &transform(0.5, 0, 0),
            Anchor::Center,
            (640, 480),
            layout,
        );
        // 960x540 on the reference canvas is 320x240 here, centered.
        assert_eq!(*out.get_pixel(160, 120), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(479, 359), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(159, 119), CANVAS_BACKGROUND);
        assert_eq!(*out.get_pixel(480, 360), CANVAS_BACKGROUND);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn output_always_matches_canvas(
            scale_pct in 1u32..=300,
            offset_x in -80i32..80,
            offset_y in -60i32..60,
            anchor_center in any::<bool>(),
        ) {
            let anchor = if anchor_center { Anchor::Center } else { Anchor::Origin };
            let out = apply_transform(
                &white(64, 48),
                &transform(scale_pct as f64 / 100.0, offset_x, offset_y),
                anchor,
                (80, 60),
                LayoutScale::IDENTITY,
            );
            prop_assert_eq!(out.dimensions(), (80, 60));
        }
    }
}
