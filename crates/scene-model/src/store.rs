//! Snapshot-on-read scene sharing.
//!
//! The UI thread edits through [`SceneStore::update`], which clones the
//! current book, mutates the clone, and swaps it in. Worker loops call
//! [`SceneStore::active_scene`] once per iteration and always see a
//! consistent scene, never a half-applied multi-field edit.

use std::sync::{Arc, PoisonError, RwLock};

use crate::book::SceneBook;
use crate::scene::Scene;

#[derive(Debug, Default)]
pub struct SceneStore {
    current: RwLock<Arc<SceneBook>>,
}

impl SceneStore {
    pub fn new(mut book: SceneBook) -> Self {
        book.normalize();
        Self {
            current: RwLock::new(Arc::new(book)),
        }
    }

    /// The whole book as of now.
    pub fn snapshot(&self) -> Arc<SceneBook> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy of the active scene.
    pub fn active_scene(&self) -> Scene {
        self.snapshot().active_scene().clone()
    }

    /// Apply an edit to the book and publish the result.
    pub fn update<R>(&self, edit: impl FnOnce(&mut SceneBook) -> R) -> R {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let book = Arc::make_mut(&mut guard);
        let result = edit(book);
        book.normalize();
        result
    }

    /// Apply an edit to the active scene.
    pub fn update_active<R>(&self, edit: impl FnOnce(&mut Scene) -> R) -> R {
        self.update(|book| edit(book.active_scene_mut()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SourceKind;

    #[test]
    fn snapshots_are_isolated_from_later_edits() {
        let store = SceneStore::new(SceneBook::default());
        let before = store.snapshot();

        store.update_active(|scene| {
            scene.select_source(SourceKind::Window);
            scene.transforms.window.scale = 0.5;
        });

        assert_eq!(before.active_scene().active_source(), Some(SourceKind::Screen));
        let after = store.active_scene();
        assert_eq!(after.active_source(), Some(SourceKind::Window));
        assert_eq!(after.transforms.window.scale, 0.5);
    }

    #[test]
    fn concurrent_readers_see_whole_edits() {
        let store = Arc::new(SceneStore::new(SceneBook::default()));
        let reader = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..2000 {
                    let scene = store.active_scene();
                    let t = scene.transforms.screen;
                    // Writers always set both offsets to the same value.
                    assert_eq!(t.offset_x, t.offset_y);
                }
            })
        };

        for i in 0..2000 {
            store.update_active(|scene| {
                scene.transforms.screen.offset_x = i;
                scene.transforms.screen.offset_y = i;
            });
        }
        reader.join().unwrap();
    }
}
