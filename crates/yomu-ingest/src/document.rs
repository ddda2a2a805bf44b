use std::fmt;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use tokio::io::AsyncRead;
use tokio::sync::OnceCell;

use yomu_core::{Extraction, Extractor, Metadata, MimeType, OutputKind};

use crate::source::DocumentSource;
use crate::{ConstructionError, IngestError};

/// A document bound to one source, with every extracted representation
/// computed at most once.
///
/// The raw bytes are fetched on first use and shared by all extractions.
/// `mimetype` and `creation_date` are derived from the cached metadata, so
/// they never cost another engine call once `metadata` has run. Failures
/// are not cached; a later call retries.
pub struct Document {
    source: DocumentSource,
    extractor: Extractor,
    client: reqwest::Client,
    data: OnceCell<Vec<u8>>,
    text: OnceCell<String>,
    html: OnceCell<String>,
    metadata: OnceCell<Metadata>,
    mimetype: OnceCell<MimeType>,
    creation_date: OnceCell<Option<DateTime<FixedOffset>>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("source", &self.source)
            .field("extractor", &self.extractor)
            .field("fetched", &self.data.initialized())
            .finish()
    }
}

impl Document {
    pub fn new(source: DocumentSource, extractor: Extractor) -> Self {
        Self {
            source,
            extractor,
            client: reqwest::Client::new(),
            data: OnceCell::new(),
            text: OnceCell::new(),
            html: OnceCell::new(),
            metadata: OnceCell::new(),
            mimetype: OnceCell::new(),
            creation_date: OnceCell::new(),
        }
    }

    /// Path if it exists, otherwise an http(s) URI. See [`DocumentSource::open`].
    pub fn open(input: &str, extractor: Extractor) -> Result<Self, ConstructionError> {
        Ok(Self::new(DocumentSource::open(input)?, extractor))
    }

    pub fn from_path(path: impl AsRef<Path>, extractor: Extractor) -> Result<Self, ConstructionError> {
        Ok(Self::new(DocumentSource::from_path(path)?, extractor))
    }

    pub fn from_uri(uri: &str, extractor: Extractor) -> Result<Self, ConstructionError> {
        Ok(Self::new(DocumentSource::from_uri(uri)?, extractor))
    }

    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static, extractor: Extractor) -> Self {
        Self::new(DocumentSource::from_reader(reader), extractor)
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>, extractor: Extractor) -> Self {
        Self::new(DocumentSource::from_bytes(bytes), extractor)
    }

    /// HTTP client used for remote sources.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn is_path(&self) -> bool {
        self.source.is_path()
    }

    pub fn is_uri(&self) -> bool {
        self.source.is_uri()
    }

    pub fn is_stream(&self) -> bool {
        self.source.is_stream()
    }

    pub async fn data(&self) -> Result<&[u8], IngestError> {
        let data = self
            .data
            .get_or_try_init(|| self.source.fetch(&self.client))
            .await?;
        Ok(data.as_slice())
    }

    pub async fn text(&self) -> Result<&str, IngestError> {
        let text = self
            .text
            .get_or_try_init(|| async {
                let data = self.data().await?;
                Ok::<_, IngestError>(self.extractor.text(data).await?)
            })
            .await?;
        Ok(text.as_str())
    }

    pub async fn html(&self) -> Result<&str, IngestError> {
        let html = self
            .html
            .get_or_try_init(|| async {
                let data = self.data().await?;
                Ok::<_, IngestError>(self.extractor.html(data).await?)
            })
            .await?;
        Ok(html.as_str())
    }

    pub async fn metadata(&self) -> Result<&Metadata, IngestError> {
        self.metadata
            .get_or_try_init(|| async {
                let data = self.data().await?;
                Ok::<_, IngestError>(self.extractor.metadata(data).await?)
            })
            .await
    }

    pub async fn mimetype(&self) -> Result<&MimeType, IngestError> {
        self.mimetype
            .get_or_try_init(|| async {
                let metadata = self.metadata().await?;
                Ok::<_, IngestError>(self.extractor.resolve_mimetype(metadata)?)
            })
            .await
    }

    /// `Creation-Date` from the metadata; `None` when the field is absent.
    pub async fn creation_date(&self) -> Result<Option<DateTime<FixedOffset>>, IngestError> {
        let date = self
            .creation_date
            .get_or_try_init(|| async {
                let metadata = self.metadata().await?;
                Ok::<_, IngestError>(metadata.creation_date()?)
            })
            .await?;
        Ok(*date)
    }

    /// Any representation by kind, served from the same caches.
    pub async fn read(&self, kind: OutputKind) -> Result<Extraction, IngestError> {
        Ok(match kind {
            OutputKind::Text => Extraction::Text(self.text().await?.to_string()),
            OutputKind::Html => Extraction::Html(self.html().await?.to_string()),
            OutputKind::Metadata => Extraction::Metadata(self.metadata().await?.clone()),
            OutputKind::Mimetype => Extraction::Mimetype(self.mimetype().await?.clone()),
        })
    }
}
