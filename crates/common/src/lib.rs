//! SceneCast Common Utilities
//!
//! Shared infrastructure for all SceneCast crates:
//! - Error types and result aliases
//! - Pause-aware recording clock and loop pacing
//! - Bounded worker-thread joins
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod thread;

pub use clock::*;
pub use config::*;
pub use error::*;
