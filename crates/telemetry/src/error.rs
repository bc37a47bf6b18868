//! Errors raised while building laps or reading telemetry logs.

use std::path::PathBuf;

use laprender_common::LaprenderError;

/// Errors that can occur when working with telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Lap {index} has no fixes")]
    EmptyLap { index: u32 },

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path} line {line}: {message}")]
    ParseError {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Unknown column '{column}' in {path}")]
    UnknownColumn { path: PathBuf, column: String },

    #[error("No parser accepts {path}")]
    UnsupportedFormat { path: PathBuf },
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;

impl From<TelemetryError> for LaprenderError {
    fn from(err: TelemetryError) -> Self {
        match err {
            TelemetryError::IoError { source, .. } => LaprenderError::Io(source),
            other => LaprenderError::telemetry(other.to_string()),
        }
    }
}
