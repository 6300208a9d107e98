use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`crate::Ingestor::submit`] and input construction.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Caller supplied an argument the ingestion path cannot honor.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine rejected the encoded image written to its input slot.
    #[error("error attempting to read image")]
    UnreadableImage,

    /// Bitmap normalization (decode or re-encode) failed.
    #[error("bitmap normalization failed: {0}")]
    Codec(#[from] image::ImageError),

    /// An input file could not be read from the host filesystem.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Allocation, heap or filesystem failure reported by the engine handle.
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

impl IngestError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        IngestError::InvalidArgument(msg.into())
    }
}
