use thiserror::Error;

pub mod document;
pub mod source;

// Re-export domain types for convenience
pub use document::Document;
pub use source::DocumentSource;
pub use yomu_core::{BridgeError, Extraction, Extractor, Metadata, MetadataValue, MimeType, OutputKind};

/// Raised when a document cannot be constructed from its input.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("missing file or invalid URI - {0}")]
    NotFound(String),
    #[error("invalid URI `{uri}`: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("can't read from {0}")]
    UnsupportedInput(String),
}

impl ConstructionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConstructionError::NotFound(_))
    }

    /// The input is of a kind no source can read.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            ConstructionError::UnsupportedInput(_) | ConstructionError::InvalidUri { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("I/O error reading document: {0}")]
    Io(#[from] std::io::Error),
    #[error("document stream was already consumed")]
    StreamConsumed,
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl IngestError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, IngestError::Bridge(e) if e.is_timeout())
    }
}
