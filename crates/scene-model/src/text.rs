//! Text annotations burned into the composite.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Family name that always resolves to the font bundled with the renderer.
pub const BUILTIN_FONT_FAMILY: &str = "builtin";

/// Bounds applied when scrolling a text object's scale.
pub const MIN_TEXT_SCALE: f64 = 0.1;
pub const MAX_TEXT_SCALE: f64 = 10.0;

/// Scale multiplier applied per scroll step.
pub const SCROLL_STEP_FACTOR: f64 = 1.1;

/// Area covered by a rendered text object, relative to its anchor point.
///
/// A background box extends past the anchor, so `dx`/`dy` may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextExtent {
    pub dx: i32,
    pub dy: i32,
    pub width: u32,
    pub height: u32,
}

impl TextExtent {
    /// Extent of a box starting at the anchor.
    pub fn at_anchor(width: u32, height: u32) -> Self {
        Self { dx: 0, dy: 0, width, height }
    }
}

/// A text annotation anchored at its top-left corner in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextObject {
    pub text: String,
    pub x: i32,
    pub y: i32,

    /// Nominal font size in pixels.
    pub font_size: f64,
    pub font_color: Color,

    /// Font family name or a path to a TrueType/OpenType file.
    pub font_family: String,

    /// Optional filled box drawn behind the text.
    pub background_color: Option<Color>,

    /// Background opacity in `[0, 1]`; 0 disables the background.
    pub background_alpha: f64,

    pub visible: bool,

    /// Multiplies the effective font size.
    pub scale: f64,
}

impl Default for TextObject {
    fn default() -> Self {
        Self {
            text: "Text".to_string(),
            x: 50,
            y: 50,
            font_size: 32.0,
            font_color: Color::WHITE,
            font_family: "DejaVu Sans".to_string(),
            background_color: None,
            background_alpha: 0.0,
            visible: true,
            scale: 1.0,
        }
    }
}

impl TextObject {
    pub fn new(text: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            ..Self::default()
        }
    }

    /// `font_size * scale`, never below one pixel.
    pub fn effective_font_size(&self) -> f64 {
        (self.font_size * self.scale).max(1.0)
    }

    /// Background color and opacity when a background should be painted.
    pub fn background(&self) -> Option<(Color, f64)> {
        let color = self.background_color?;
        let alpha = self.background_alpha.clamp(0.0, 1.0);
        (alpha > 0.0).then_some((color, alpha))
    }

    /// Multiply the scale by [`SCROLL_STEP_FACTOR`] per step (negative shrinks).
    pub fn scroll_scale(&mut self, steps: i32) {
        let factor = SCROLL_STEP_FACTOR.powi(steps);
        self.scale = (self.scale * factor).clamp(MIN_TEXT_SCALE, MAX_TEXT_SCALE);
    }
}
