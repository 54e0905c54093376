//! Error types shared across Teaser crates.

/// Top-level error type for Teaser operations.
#[derive(Debug, thiserror::Error)]
pub enum TeaserError {
    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    #[error("Region index {index} out of range (grid has {len} regions)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Format {format} is not supported")]
    UnsupportedFormat { format: String },

    #[error("Invalid quality: {message}")]
    InvalidQuality { message: String },

    #[error("Encode failure: {message}")]
    EncodeFailure { message: String },

    /// Non-success HTTP status from the upload target.
    #[error("{status}: {status_text}")]
    UploadFailure { status: u16, status_text: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Load error: {message}")]
    Load { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using TeaserError.
pub type TeaserResult<T> = Result<T, TeaserError>;

impl TeaserError {
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: msg.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn invalid_quality(msg: impl Into<String>) -> Self {
        Self::InvalidQuality {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::EncodeFailure {
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
        }
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load {
            message: msg.into(),
        }
    }
}
