//! Error types for peelview.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for peelview operations.
#[derive(Error, Debug)]
pub enum PeelError {
    /// A layer file is truncated, has an invalid header, or disagrees with its sibling file.
    #[error("corrupt layer data in '{}': {reason}", path.display())]
    DataCorruption {
        /// The offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The file name carries no numeric layer id.
    #[error("invalid layer file name '{0}': no numeric layer id")]
    InvalidLayerFilename(String),

    /// Layer dimensions are zero, negative, or do not fit in the header.
    #[error("invalid layer dimensions {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PeelError {
    /// Shorthand for a [`PeelError::DataCorruption`] on `path`.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DataCorruption {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for peelview operations.
pub type Result<T> = std::result::Result<T, PeelError>;
