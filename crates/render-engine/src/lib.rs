//! SceneCast Render Engine
//!
//! Pure frame operations shared by the preview and recording loops.
//!
//! ```text
//! captured frame ──► Transform (scale / offset into canvas)
//!                          │
//!                          ├── Text Overlay (z-ordered text objects)
//!                          │
//!                          ├── Status badge (REC / PAUSED)
//!                          ▼
//!                    composite canvas
//! ```
//!
//! Nothing here touches capture devices or threads; the same inputs
//! always produce the same pixels.

pub mod compositor;
pub mod font;
pub mod indicator;
pub mod overlay;
pub mod placeholder;
pub mod transform;

pub use compositor::*;
pub use indicator::*;
pub use overlay::*;
pub use placeholder::*;
pub use transform::*;
