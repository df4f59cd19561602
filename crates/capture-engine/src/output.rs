//! Timestamped output file naming.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Timestamp layout shared by recordings and voice notes.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// `<dir>/<prefix>_<timestamp>.<ext>`, suffixed `_N` until the name is free.
pub fn timestamped_path(dir: &Path, prefix: &str, ext: &str, at: DateTime<Local>) -> PathBuf {
    let stem = format!("{prefix}_{}", at.format(TIMESTAMP_FORMAT));
    let ext = ext.trim_start_matches('.');
    let candidate = dir.join(format!("{stem}.{ext}"));
    if !candidate.exists() {
        return candidate;
    }
    (1u32..)
        .map(|n| dir.join(format!("{stem}_{n}.{ext}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Path for a recording started at `at`.
pub fn recording_path(dir: &Path, container: &str, at: DateTime<Local>) -> PathBuf {
    timestamped_path(dir, "screen", container, at)
}

/// Path for a standalone voice recording started at `at`.
pub fn voice_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    timestamped_path(dir, "voice", "wav", at)
}

/// Audio sidecar next to a video file: same stem, `.wav`.
pub fn sidecar_audio_path(video: &Path) -> PathBuf {
    video.with_extension("wav")
}
