//! Where a document's bytes come from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use reqwest::Url;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{ConstructionError, IngestError};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Exactly one of a local path, a remote URI or a readable stream.
pub enum DocumentSource {
    Path(PathBuf),
    RemoteUri(Url),
    /// Drained on first fetch; a second fetch fails.
    Stream(Mutex<Option<BoxedReader>>),
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            DocumentSource::RemoteUri(url) => f.debug_tuple("RemoteUri").field(&url.as_str()).finish(),
            DocumentSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl DocumentSource {
    /// Classify a string input.
    ///
    /// An existing local path wins. Otherwise `http`/`https` URLs are remote
    /// sources and `file` URLs are local paths; any other URL scheme is
    /// unsupported, and anything else is a missing file.
    pub fn open(input: &str) -> Result<Self, ConstructionError> {
        let path = Path::new(input);
        if path.exists() {
            return Ok(DocumentSource::Path(path.to_path_buf()));
        }
        match Url::parse(input) {
            Ok(url) => Self::from_url(url),
            Err(_) => Err(ConstructionError::NotFound(input.to_string())),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConstructionError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConstructionError::NotFound(path.display().to_string()));
        }
        Ok(DocumentSource::Path(path.to_path_buf()))
    }

    pub fn from_uri(uri: &str) -> Result<Self, ConstructionError> {
        let url = Url::parse(uri).map_err(|e| ConstructionError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_url(url)
    }

    fn from_url(url: Url) -> Result<Self, ConstructionError> {
        match url.scheme() {
            "http" | "https" => Ok(DocumentSource::RemoteUri(url)),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| ConstructionError::NotFound(url.to_string()))?;
                Self::from_path(path)
            }
            scheme => Err(ConstructionError::UnsupportedInput(format!(
                "{scheme} URI {url}"
            ))),
        }
    }

    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        DocumentSource::Stream(Mutex::new(Some(Box::new(reader))))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_reader(std::io::Cursor::new(bytes.into()))
    }

    pub fn is_path(&self) -> bool {
        matches!(self, DocumentSource::Path(_))
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, DocumentSource::RemoteUri(_))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, DocumentSource::Stream(_))
    }

    /// Read the whole document: from disk, by HTTP GET, or by draining the
    /// stream.
    pub async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<u8>, IngestError> {
        match self {
            DocumentSource::Path(path) => Ok(tokio::fs::read(path).await?),
            DocumentSource::RemoteUri(url) => {
                let fetch_err = |source| IngestError::Fetch {
                    url: url.to_string(),
                    source,
                };
                let response = client
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(fetch_err)?;
                let body = response.bytes().await.map_err(fetch_err)?;
                tracing::debug!(url = %url, bytes = body.len(), "fetched remote document");
                Ok(body.to_vec())
            }
            DocumentSource::Stream(slot) => {
                // A panic elsewhere while holding the lock leaves the
                // reader itself intact.
                let reader = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                let mut reader = reader.ok_or(IngestError::StreamConsumed)?;
                let mut data = Vec::new();
                reader.read_to_end(&mut data).await?;
                Ok(data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_path_is_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = DocumentSource::open(file.path().to_str().unwrap()).unwrap();
        assert!(source.is_path());
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = DocumentSource::open("test/documents/nope.doc").unwrap_err();
        assert!(matches!(err, ConstructionError::NotFound(ref p) if p == "test/documents/nope.doc"));
        assert!(err.is_not_found());
        assert!(matches!(
            DocumentSource::from_path("/definitely/not/here.pdf").unwrap_err(),
            ConstructionError::NotFound(_)
        ));
    }

    #[test]
    fn http_url_is_remote() {
        let source = DocumentSource::open("https://example.com/report.pdf").unwrap();
        assert!(source.is_uri());
    }

    #[test]
    fn file_url_becomes_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let url = Url::from_file_path(file.path()).unwrap();
        let source = DocumentSource::open(url.as_str()).unwrap();
        assert!(source.is_path());
    }

    #[test]
    fn other_schemes_are_unsupported() {
        let err = DocumentSource::open("mailto:someone@example.com").unwrap_err();
        assert!(matches!(err, ConstructionError::UnsupportedInput(_)));
        assert!(err.is_unsupported());
    }

    #[test]
    fn from_uri_rejects_garbage() {
        assert!(matches!(
            DocumentSource::from_uri("not a uri").unwrap_err(),
            ConstructionError::InvalidUri { .. }
        ));
    }

    #[tokio::test]
    async fn stream_drains_once() {
        let source = DocumentSource::from_bytes(b"streamed".to_vec());
        assert!(source.is_stream());
        let client = reqwest::Client::new();
        assert_eq!(source.fetch(&client).await.unwrap(), b"streamed");
        assert!(matches!(
            source.fetch(&client).await.unwrap_err(),
            IngestError::StreamConsumed
        ));
    }

    #[tokio::test]
    async fn poisoned_stream_still_drains() {
        let source = DocumentSource::from_bytes(b"survivor".to_vec());
        std::thread::scope(|s| {
            let poisoner = s.spawn(|| {
                let DocumentSource::Stream(slot) = &source else {
                    unreachable!()
                };
                let _guard = slot.lock().unwrap();
                panic!("reader holder panicked");
            });
            assert!(poisoner.join().is_err());
        });
        let client = reqwest::Client::new();
        assert_eq!(source.fetch(&client).await.unwrap(), b"survivor");
    }
}
