//! Error taxonomy shared by every tool.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while processing a single item.
///
/// Batch operations never propagate these past the item boundary; they are
/// collected into a [`BatchReport`](crate::BatchReport) instead.
#[derive(Error, Debug)]
pub enum ToolError {
    /// A required input path does not exist.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Unrecognized extension or a file that failed to decode.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A transform, encode or external process failed.
    #[error("{operation} failed: {reason}")]
    ProcessingFailure { operation: String, reason: String },

    /// A user-supplied parameter is out of range.
    #[error("Validation failed for {field}: {reason}")]
    ValidationFailure { field: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    pub fn processing(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::ProcessingFailure {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationFailure {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Map an `image` crate error for `path` into the taxonomy.
    pub fn from_image(path: &Path, err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::FileNotFound(path.to_path_buf())
            }
            image::ImageError::IoError(e) => Self::Io(e),
            image::ImageError::Unsupported(e) => {
                Self::UnsupportedFormat(format!("{}: {}", path.display(), e))
            }
            image::ImageError::Decoding(e) => {
                Self::UnsupportedFormat(format!("{}: {}", path.display(), e))
            }
            other => Self::processing(format!("Encoding {}", path.display()), other),
        }
    }

    /// Process exit code for this error when it ends a run.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ValidationFailure { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ToolError>;
