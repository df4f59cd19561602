//! Error types shared across SceneCast crates.

use std::path::PathBuf;

/// Top-level error type for SceneCast operations.
#[derive(Debug, thiserror::Error)]
pub enum ScenecastError {
    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Camera error: {message}")]
    Camera { message: String },

    #[error("Encoder error: {message}")]
    Encoder { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Scene error: {message}")]
    Scene { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ScenecastError.
pub type ScenecastResult<T> = Result<T, ScenecastError>;

impl ScenecastError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn camera(msg: impl Into<String>) -> Self {
        Self::Camera {
            message: msg.into(),
        }
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder {
            message: msg.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio {
            message: msg.into(),
        }
    }

    pub fn scene(msg: impl Into<String>) -> Self {
        Self::Scene {
            message: msg.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }
}
