//! Error types shared across Laprender crates.

use std::path::PathBuf;

/// Top-level error type for Laprender operations.
#[derive(Debug, thiserror::Error)]
pub enum LaprenderError {
    #[error("Telemetry error: {message}")]
    Telemetry { message: String },

    #[error("Video error: {message}")]
    Video { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Calibration error: {message}")]
    Calibration { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using LaprenderError.
pub type LaprenderResult<T> = Result<T, LaprenderError>;

impl LaprenderError {
    pub fn telemetry(msg: impl Into<String>) -> Self {
        Self::Telemetry {
            message: msg.into(),
        }
    }

    pub fn video(msg: impl Into<String>) -> Self {
        Self::Video {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn calibration(msg: impl Into<String>) -> Self {
        Self::Calibration {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Failures scoped to a single input or output file.
    ///
    /// Batch callers log these and move on to the next lap; anything else
    /// (output stream, disk, encoder spawn) aborts the current render.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::Video { .. } | Self::Encode { .. } | Self::FileNotFound { .. }
        )
    }
}
