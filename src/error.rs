//! Error taxonomy shared by every library operation.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by template handling, rendering, export and bulk runs.
#[derive(Debug, Error)]
pub enum CardError {
    /// Missing required template fields, bad region geometry or an empty
    /// name list. Raised before any I/O starts.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The background image could not be fetched or decoded.
    #[error("failed to load image {source_url}: {reason}")]
    ImageLoad { source_url: String, reason: String },

    /// The surface could not be turned into bytes (PNG or archive).
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// A font or name-list file with the wrong extension or content type.
    #[error("unsupported file {}: expected {expected}", path.display())]
    UnsupportedFile { path: PathBuf, expected: String },

    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("template storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CardError {
    pub(crate) fn image_load(source_url: &str, reason: impl ToString) -> Self {
        CardError::ImageLoad {
            source_url: source_url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(path: impl Into<PathBuf>, expected: &str) -> Self {
        CardError::UnsupportedFile {
            path: path.into(),
            expected: expected.to_string(),
        }
    }
}

pub type Result<T, E = CardError> = std::result::Result<T, E>;
