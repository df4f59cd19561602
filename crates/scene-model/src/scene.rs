//! Scene: source selection, per-source transforms, and text objects.

use serde::{Deserialize, Serialize};

use scenecast_common::error::{ScenecastError, ScenecastResult};
use scenecast_platform_core::Rect;

use crate::text::{TextExtent, TextObject};

/// The three interchangeable capture sources, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Screen,
    Window,
    Camera,
}

impl SourceKind {
    /// Highest priority first.
    pub const PRIORITY: [SourceKind; 3] = [SourceKind::Screen, SourceKind::Window, SourceKind::Camera];

    /// Where transform offsets are measured from for this source.
    pub fn anchor(self) -> Anchor {
        match self {
            SourceKind::Screen => Anchor::Origin,
            SourceKind::Window | SourceKind::Camera => Anchor::Center,
        }
    }
}

/// Reference point for a source's offset inside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Offsets measured from the canvas top-left corner.
    Origin,
    /// Offsets measured from a centered placement.
    Center,
}

/// Source enable flags. Several may be set; the active one is picked by priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFlags {
    pub full_screen: bool,
    pub window: bool,
    pub camera: bool,
}

impl SourceFlags {
    pub fn is_enabled(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Screen => self.full_screen,
            SourceKind::Window => self.window,
            SourceKind::Camera => self.camera,
        }
    }

    pub fn set(&mut self, kind: SourceKind, enabled: bool) {
        match kind {
            SourceKind::Screen => self.full_screen = enabled,
            SourceKind::Window => self.window = enabled,
            SourceKind::Camera => self.camera = enabled,
        }
    }

    /// Highest-priority enabled source.
    pub fn active(&self) -> Option<SourceKind> {
        SourceKind::PRIORITY
            .into_iter()
            .find(|kind| self.is_enabled(*kind))
    }
}

/// Scale and pixel offset applied to one source before compositing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceTransform {
    pub scale: f64,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Default for SourceTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0,
            offset_y: 0,
        }
    }
}

impl SourceTransform {
    /// Unit scale and no offset: the source is simply fitted to the canvas.
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset_x == 0 && self.offset_y == 0
    }
}

/// Editable transform field, as exposed by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformField {
    Scale,
    OffsetX,
    OffsetY,
}

/// One transform per source kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transforms {
    pub screen: SourceTransform,
    pub window: SourceTransform,
    pub camera: SourceTransform,
}

/// Requested camera capture size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// The resolved capture instruction for the active source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelection {
    FullScreen,
    Window { rect: Option<Rect> },
    Camera { index: u32, resolution: Resolution },
}

impl SourceSelection {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceSelection::FullScreen => SourceKind::Screen,
            SourceSelection::Window { .. } => SourceKind::Window,
            SourceSelection::Camera { .. } => SourceKind::Camera,
        }
    }
}

/// Ratio between a render canvas and the reference (recording) canvas.
///
/// Scene coordinates are expressed on the reference canvas; smaller
/// canvases such as the preview scale positions and sizes by this ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutScale {
    pub x: f64,
    pub y: f64,
}

impl LayoutScale {
    pub const IDENTITY: LayoutScale = LayoutScale { x: 1.0, y: 1.0 };

    pub fn between(canvas: (u32, u32), reference: (u32, u32)) -> Self {
        Self {
            x: canvas.0 as f64 / reference.0.max(1) as f64,
            y: canvas.1 as f64 / reference.1.max(1) as f64,
        }
    }

    /// Uniform factor for sizes (fonts).
    pub fn size_factor(&self) -> f64 {
        self.x.min(self.y)
    }
}

/// Direction for z-order changes of a text object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restack {
    /// Swap with the object above (drawn later).
    Raise,
    /// Swap with the object below (drawn earlier).
    Lower,
}

/// A named, independently configurable capture and overlay setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub name: String,
    pub sources: SourceFlags,

    /// Rectangle of the selected window, captured at selection time.
    pub window_rect: Option<Rect>,

    /// Title of the selected window, for display.
    pub window_title: Option<String>,

    pub camera_index: u32,
    pub camera_resolution: Resolution,
    pub audio_enabled: bool,
    pub transforms: Transforms,

    /// Draw order: first is bottom-most.
    pub text_objects: Vec<TextObject>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Scene 1")
    }
}

impl Scene {
    /// A scene capturing the full screen with no annotations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: SourceFlags {
                full_screen: true,
                window: false,
                camera: false,
            },
            window_rect: None,
            window_title: None,
            camera_index: 0,
            camera_resolution: Resolution::default(),
            audio_enabled: false,
            transforms: Transforms::default(),
            text_objects: Vec::new(),
        }
    }

    /// Highest-priority enabled source.
    pub fn active_source(&self) -> Option<SourceKind> {
        self.sources.active()
    }

    /// Capture instruction for the active source.
    pub fn selection(&self) -> Option<SourceSelection> {
        self.active_source().map(|kind| match kind {
            SourceKind::Screen => SourceSelection::FullScreen,
            SourceKind::Window => SourceSelection::Window {
                rect: self.window_rect,
            },
            SourceKind::Camera => SourceSelection::Camera {
                index: self.camera_index,
                resolution: self.camera_resolution,
            },
        })
    }

    /// Enable `kind` and disable the other sources.
    pub fn select_source(&mut self, kind: SourceKind) {
        self.sources = SourceFlags::default();
        self.sources.set(kind, true);
    }

    pub fn transform(&self, kind: SourceKind) -> &SourceTransform {
        match kind {
            SourceKind::Screen => &self.transforms.screen,
            SourceKind::Window => &self.transforms.window,
            SourceKind::Camera => &self.transforms.camera,
        }
    }

    pub fn transform_mut(&mut self, kind: SourceKind) -> &mut SourceTransform {
        match kind {
            SourceKind::Screen => &mut self.transforms.screen,
            SourceKind::Window => &mut self.transforms.window,
            SourceKind::Camera => &mut self.transforms.camera,
        }
    }

    /// Apply a raw text edit to a transform field.
    ///
    /// Malformed numbers and non-positive scales are ignored; returns
    /// whether the edit was applied.
    pub fn apply_transform_edit(&mut self, kind: SourceKind, field: TransformField, raw: &str) -> bool {
        let raw = raw.trim();
        let transform = self.transform_mut(kind);
        match field {
            TransformField::Scale => match raw.parse::<f64>() {
                Ok(scale) if scale.is_finite() && scale > 0.0 => {
                    transform.scale = scale;
                    true
                }
                _ => false,
            },
            TransformField::OffsetX => match raw.parse::<i32>() {
                Ok(offset) => {
                    transform.offset_x = offset;
                    true
                }
                Err(_) => false,
            },
            TransformField::OffsetY => match raw.parse::<i32>() {
                Ok(offset) => {
                    transform.offset_y = offset;
                    true
                }
                Err(_) => false,
            },
        }
    }

    /// Record the window chosen in the picker.
    pub fn set_window(&mut self, rect: Rect, title: impl Into<String>) {
        self.window_rect = Some(rect);
        self.window_title = Some(title.into());
    }

    /// Check the invariants the pipelines rely on.
    pub fn validate(&self) -> ScenecastResult<()> {
        for kind in SourceKind::PRIORITY {
            let scale = self.transform(kind).scale;
            if !(scale.is_finite() && scale > 0.0) {
                return Err(ScenecastError::scene(format!(
                    "{kind:?} scale must be positive, got {scale}"
                )));
            }
        }
        if self.camera_resolution.width == 0 || self.camera_resolution.height == 0 {
            return Err(ScenecastError::scene("Camera resolution must be non-zero"));
        }
        for (index, text) in self.text_objects.iter().enumerate() {
            if !(text.scale.is_finite() && text.scale > 0.0) {
                return Err(ScenecastError::scene(format!(
                    "Text object {index} scale must be positive"
                )));
            }
            if !(text.font_size.is_finite() && text.font_size > 0.0) {
                return Err(ScenecastError::scene(format!(
                    "Text object {index} font size must be positive"
                )));
            }
        }
        Ok(())
    }

    /// Append a text object on top of the stack; returns its index.
    pub fn add_text(&mut self, text: TextObject) -> usize {
        self.text_objects.push(text);
        self.text_objects.len() - 1
    }

    pub fn remove_text(&mut self, index: usize) -> Option<TextObject> {
        (index < self.text_objects.len()).then(|| self.text_objects.remove(index))
    }

    /// Swap a text object with its neighbour; returns the new index.
    pub fn restack_text(&mut self, index: usize, direction: Restack) -> Option<usize> {
        let target = match direction {
            Restack::Raise => index.checked_add(1)?,
            Restack::Lower => index.checked_sub(1)?,
        };
        if index >= self.text_objects.len() || target >= self.text_objects.len() {
            return None;
        }
        self.text_objects.swap(index, target);
        Some(target)
    }

    /// Top-most visible text object under a point on a scaled canvas.
    ///
    /// `measure` returns the area a text object covers on the reference
    /// canvas, background included.
    pub fn hit_test(
        &self,
        x: f64,
        y: f64,
        layout: LayoutScale,
        measure: impl Fn(&TextObject) -> TextExtent,
    ) -> Option<usize> {
        let (cx, cy) = (x / layout.x, y / layout.y);
        self.text_objects
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, text)| text.visible)
            .find(|(_, text)| {
                let extent = measure(text);
                let left = text.x as f64 + extent.dx as f64;
                let top = text.y as f64 + extent.dy as f64;
                cx >= left && cx < left + extent.width as f64 && cy >= top && cy < top + extent.height as f64
            })
            .map(|(index, _)| index)
    }

    /// Move a text object by a drag delta measured on a scaled canvas.
    pub fn drag_text(&mut self, index: usize, dx: f64, dy: f64, layout: LayoutScale) -> bool {
        let Some(text) = self.text_objects.get_mut(index) else {
            return false;
        };
        text.x = text.x.saturating_add((dx / layout.x).round() as i32);
        text.y = text.y.saturating_add((dy / layout.y).round() as i32);
        true
    }

    /// Grow or shrink a text object by scroll steps.
    pub fn scroll_text(&mut self, index: usize, steps: i32) -> bool {
        let Some(text) = self.text_objects.get_mut(index) else {
            return false;
        };
        text.scroll_scale(steps);
        true
    }
}
