//! Error types shared across Mosaic crates.

use std::path::PathBuf;

/// Top-level error type for Mosaic operations.
#[derive(Debug, thiserror::Error)]
pub enum MosaicError {
    /// An image, video, or audio source failed to fetch or decode.
    #[error("Failed to load media {src}: {message}")]
    MediaLoad { src: String, message: String },

    /// The runtime lacks the encoder needed for the requested export.
    #[error("Unsupported export target: {message}")]
    UnsupportedExportTarget { message: String },

    /// The encoder failed while frames were being produced.
    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Export duration resolved to zero seconds")]
    ZeroDurationExport,

    #[error("Export cancelled")]
    ExportCancelled,

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

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

/// Result type alias using MosaicError.
pub type MosaicResult<T> = Result<T, MosaicError>;

impl MosaicError {
    pub fn media_load(src: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MediaLoad {
            src: src.into(),
            message: msg.into(),
        }
    }

    pub fn unsupported_export(msg: impl Into<String>) -> Self {
        Self::UnsupportedExportTarget {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error belongs to an export job rather than the editing session.
    pub fn is_export_failure(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedExportTarget { .. }
                | Self::Encode { .. }
                | Self::ZeroDurationExport
                | Self::ExportCancelled
        )
    }
}
