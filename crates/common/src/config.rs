//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where recordings are written.
    pub output_dir: PathBuf,

    /// Recording output parameters.
    pub recording: RecordingSettings,

    /// Live preview parameters.
    pub preview: PreviewSettings,

    /// Window-region capture bounds.
    pub window_capture: WindowCaptureLimits,

    /// How long shutdown waits for each worker thread (milliseconds).
    pub shutdown_timeout_ms: u64,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Recording canvas, frame rate, and audio format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecordingSettings {
    /// Output canvas width.
    pub width: u32,

    /// Output canvas height.
    pub height: u32,

    /// Target frame rate.
    pub fps: u32,

    /// Audio sample rate requested from the input device.
    pub audio_sample_rate: u32,

    /// Audio channel count requested from the input device.
    pub audio_channels: u16,

    /// Video container file extension (`mkv` or `mp4`).
    pub container: String,
}

/// Preview canvas and cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreviewSettings {
    pub width: u32,
    pub height: u32,

    /// Producer period (milliseconds).
    pub interval_ms: u64,

    /// UI consumer poll period (milliseconds).
    pub ui_poll_ms: u64,
}

/// Bounds applied to window-region captures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowCaptureLimits {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "scenecast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            recording: RecordingSettings::default(),
            preview: PreviewSettings::default(),
            window_capture: WindowCaptureLimits::default(),
            shutdown_timeout_ms: 2000,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            audio_sample_rate: 44_100,
            audio_channels: 2,
            container: "mkv".to_string(),
        }
    }
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            interval_ms: 33,
            ui_poll_ms: 50,
        }
    }
}

impl Default for WindowCaptureLimits {
    fn default() -> Self {
        Self {
            min_width: 50,
            min_height: 50,
            max_width: 3840,
            max_height: 2160,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from `path`. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Worker join timeout as a duration.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Per-user configuration directory for SceneCast.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(std::env::temp_dir)
        .join("scenecast")
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Standard scene list location.
pub fn scenes_file_path() -> PathBuf {
    config_dir().join("scenes.json")
}

/// Default recordings directory.
fn default_output_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
