//! SceneCast Scene Model
//!
//! Defines the data contracts shared by the UI and the capture loops:
//! - **Scene:** source selection, per-source transforms, text objects, audio toggle
//! - **TextObject:** a positioned, styled text annotation
//! - **SceneBook:** the persisted list of scenes and the active index
//! - **SceneStore:** snapshot-on-read sharing between the UI and worker threads
//!
//! Only the UI thread mutates scenes. Workers read a consistent snapshot
//! once per loop iteration.

pub mod book;
pub mod color;
pub mod scene;
pub mod store;
pub mod text;

pub use book::*;
pub use color::*;
pub use scene::*;
pub use store::*;
pub use text::*;
