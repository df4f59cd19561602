//! The persisted scene list.

use std::path::Path;

use serde::{Deserialize, Serialize};

use scenecast_common::error::{ScenecastError, ScenecastResult};

use crate::scene::Scene;

/// Ordered scenes plus the index of the one being captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneBook {
    pub scenes: Vec<Scene>,
    pub active: usize,
}

impl Default for SceneBook {
    fn default() -> Self {
        Self {
            scenes: vec![Scene::new("Scene 1")],
            active: 0,
        }
    }
}

impl SceneBook {
    /// The active scene. Falls back to the first scene if the index is stale.
    pub fn active_scene(&self) -> &Scene {
        static EMPTY: std::sync::OnceLock<Scene> = std::sync::OnceLock::new();
        self.scenes
            .get(self.active)
            .or_else(|| self.scenes.first())
            .unwrap_or_else(|| EMPTY.get_or_init(Scene::default))
    }

    /// Mutable access to the active scene, creating one if the book is empty.
    pub fn active_scene_mut(&mut self) -> &mut Scene {
        self.normalize();
        &mut self.scenes[self.active]
    }

    /// Append a new scene; returns its index.
    pub fn add_scene(&mut self, name: impl Into<String>) -> usize {
        self.scenes.push(Scene::new(name));
        self.scenes.len() - 1
    }

    /// Remove a scene. The last remaining scene cannot be removed.
    pub fn remove_scene(&mut self, index: usize) -> ScenecastResult<Scene> {
        if index >= self.scenes.len() {
            return Err(ScenecastError::scene(format!("No scene at index {index}")));
        }
        if self.scenes.len() == 1 {
            return Err(ScenecastError::scene("Cannot remove the last scene"));
        }
        let removed = self.scenes.remove(index);
        if self.active > index || self.active >= self.scenes.len() {
            self.active = self.active.saturating_sub(1);
        }
        Ok(removed)
    }

    pub fn rename_scene(&mut self, index: usize, name: impl Into<String>) -> ScenecastResult<()> {
        let scene = self
            .scenes
            .get_mut(index)
            .ok_or_else(|| ScenecastError::scene(format!("No scene at index {index}")))?;
        scene.name = name.into();
        Ok(())
    }

    /// Make `index` the active scene.
    pub fn select(&mut self, index: usize) -> ScenecastResult<()> {
        if index >= self.scenes.len() {
            return Err(ScenecastError::scene(format!("No scene at index {index}")));
        }
        self.active = index;
        Ok(())
    }

    /// Repair an empty list or an out-of-range active index.
    pub fn normalize(&mut self) {
        if self.scenes.is_empty() {
            self.scenes.push(Scene::default());
        }
        if self.active >= self.scenes.len() {
            self.active = 0;
        }
    }

    pub fn to_json(&self) -> ScenecastResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a scene list. Missing keys take their defaults.
    pub fn from_json(json: &str) -> ScenecastResult<Self> {
        let mut book: SceneBook = serde_json::from_str(json)?;
        book.normalize();
        Ok(book)
    }

    pub fn load(path: &Path) -> ScenecastResult<Self> {
        if !path.exists() {
            return Err(ScenecastError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load the scene list, falling back to a single default scene.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(book) => book,
            Err(ScenecastError::FileNotFound { .. }) => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to load scenes at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> ScenecastResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::scene::{Resolution, SourceFlags, SourceTransform, Transforms};
    use crate::text::TextObject;
    use proptest::prelude::*;
    use scenecast_platform_core::Rect;

    #[test]
    fn remove_scene_keeps_active_index_valid() {
        let mut book = SceneBook::default();
        book.add_scene("Two");
        book.add_scene("Three");
        book.select(2).unwrap();

        book.remove_scene(0).unwrap();
        assert_eq!(book.active, 1);
        assert_eq!(book.active_scene().name, "Three");

        book.remove_scene(1).unwrap();
        assert_eq!(book.active_scene().name, "Two");
        assert!(book.remove_scene(0).is_err());
        assert!(book.select(4).is_err());
    }

    #[test]
    fn partial_documents_load_with_defaults() {
        let book = SceneBook::from_json(
            r#"{ "scenes": [ { "name": "Cam", "sources": { "camera": true } } ], "active": 7 }"#,
        )
        .unwrap();
        let scene = book.active_scene();
        assert_eq!(book.active, 0);
        assert_eq!(scene.name, "Cam");
        assert!(!scene.sources.full_screen);
        assert!(scene.sources.camera);
        assert_eq!(scene.camera_resolution, Resolution::default());
        assert_eq!(scene.transforms, Transforms::default());
    }

    #[test]
    fn save_and_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenes.json");
        assert_eq!(SceneBook::load_or_default(&path), SceneBook::default());

        let mut book = SceneBook::default();
        book.active_scene_mut().add_text(TextObject::new("Hello", 10, 20));
        book.save(&path).unwrap();
        assert_eq!(SceneBook::load(&path).unwrap(), book);
    }

    fn arb_color() -> impl Strategy<Value = Color> {
        any::<(u8, u8, u8)>().prop_map(|(r, g, b)| Color::rgb(r, g, b))
    }

    fn arb_text() -> impl Strategy<Value = TextObject> {
        (
            ".{0,12}",
            -2000i32..4000,
            -2000i32..4000,
            10u32..2000,
            arb_color(),
            proptest::option::of(arb_color()),
            0u32..=100,
            any::<bool>(),
            10u32..1000,
        )
            .prop_map(
                |(text, x, y, font_size, font_color, background_color, background_alpha, visible, scale)| {
                    TextObject {
                        text,
                        x,
                        y,
                        font_size: font_size as f64 / 10.0,
                        font_color,
                        font_family: "DejaVu Sans".to_string(),
                        background_color,
                        background_alpha: background_alpha as f64 / 100.0,
                        visible,
                        scale: scale as f64 / 100.0,
                    }
                },
            )
    }

    fn arb_transform() -> impl Strategy<Value = SourceTransform> {
        // Short decimals keep the JSON text stable across a reload.
        (1u32..=300, -4000i32..4000, -4000i32..4000).prop_map(|(scale, offset_x, offset_y)| {
            SourceTransform {
                scale: scale as f64 / 100.0,
                offset_x,
                offset_y,
            }
        })
    }

    fn arb_scene() -> impl Strategy<Value = Scene> {
        (
            "[A-Za-z0-9 ]{1,16}",
            any::<(bool, bool, bool)>(),
            proptest::option::of((-5000i32..5000, -5000i32..5000, 0i32..5000, 0i32..5000)),
            0u32..8,
            any::<bool>(),
            (arb_transform(), arb_transform(), arb_transform()),
            proptest::collection::vec(arb_text(), 0..4),
        )
            .prop_map(
                |(name, (full_screen, window, camera), rect, camera_index, audio_enabled, (screen, win, cam), text_objects)| {
                    Scene {
                        name,
                        sources: SourceFlags {
                            full_screen,
                            window,
                            camera,
                        },
                        window_rect: rect.map(|(x, y, w, h)| Rect::new(x, y, x + w, y + h)),
                        window_title: None,
                        camera_index,
                        camera_resolution: Resolution::default(),
                        audio_enabled,
                        transforms: Transforms {
                            screen,
                            window: win,
                            camera: cam,
                        },
                        text_objects,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn serialize_round_trip_is_stable(scenes in proptest::collection::vec(arb_scene(), 1..4)) {
            let book = SceneBook { active: scenes.len() - 1, scenes };
            let first = book.to_json().unwrap();
            let reloaded = SceneBook::from_json(&first).unwrap();
            let second = reloaded.to_json().unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(reloaded, book);
        }
    }
}
