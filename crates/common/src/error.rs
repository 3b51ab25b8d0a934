//! Error types shared across demorec crates.

use std::path::PathBuf;

/// Top-level error type for demorec operations.
#[derive(Debug, thiserror::Error)]
pub enum DemorecError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("GPU error: {message}")]
    Gpu { message: String },

    #[error("Pipe error: {message}")]
    Pipe { message: String },

    #[error("Encoder error: {message}")]
    Encoder { message: String },

    #[error("Encoder executable not found: {path}")]
    EncoderNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using DemorecError.
pub type DemorecResult<T> = Result<T, DemorecError>;

impl DemorecError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn gpu(msg: impl Into<String>) -> Self {
        Self::Gpu {
            message: msg.into(),
        }
    }

    pub fn pipe(msg: impl Into<String>) -> Self {
        Self::Pipe {
            message: msg.into(),
        }
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error means the encoder binary is missing, which the
    /// caller should surface to the user rather than treat as a crash.
    pub fn is_encoder_not_found(&self) -> bool {
        matches!(self, Self::EncoderNotFound { .. })
    }
}
