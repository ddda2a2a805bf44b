//! Extraction facade: delegate to a [`Bridge`] and decode the response.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::bridge::Bridge;
use crate::metadata::Metadata;
use crate::mime::{GuessRegistry, MimeRegistry, MimeType};
use crate::process::ProcessCall;
use crate::{BridgeError, EngineConfig, OutputKind};

/// A decoded engine response.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Text(String),
    Html(String),
    Metadata(Metadata),
    Mimetype(MimeType),
}

impl Extraction {
    pub fn kind(&self) -> OutputKind {
        match self {
            Extraction::Text(_) => OutputKind::Text,
            Extraction::Html(_) => OutputKind::Html,
            Extraction::Metadata(_) => OutputKind::Metadata,
            Extraction::Mimetype(_) => OutputKind::Mimetype,
        }
    }
}

/// Runs extraction requests through a bridge under an optional deadline.
///
/// The bridge is chosen by the caller: a [`ProcessCall`], a
/// [`SocketCall`](crate::SocketCall) for a server it started, or an
/// [`AutoBridge`](crate::AutoBridge) that follows a shared server slot.
#[derive(Clone)]
pub struct Extractor {
    bridge: Arc<dyn Bridge>,
    registry: Arc<dyn MimeRegistry>,
    timeout: Option<Duration>,
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("bridge", &self.bridge.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Extractor {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self {
            bridge,
            registry: Arc::new(GuessRegistry),
            timeout: None,
        }
    }

    /// Process-mode extractor using the engine's default timeout.
    pub fn process(engine: EngineConfig) -> Self {
        let timeout = engine.timeout;
        Self::new(Arc::new(ProcessCall::new(engine))).with_timeout(timeout)
    }

    pub fn with_registry(mut self, registry: Arc<dyn MimeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn bridge_name(&self) -> &str {
        self.bridge.name()
    }

    /// Extract `kind` from a document's raw bytes.
    pub async fn read(&self, kind: OutputKind, bytes: &[u8]) -> Result<Extraction, BridgeError> {
        Ok(match kind {
            OutputKind::Text => Extraction::Text(self.text(bytes).await?),
            OutputKind::Html => Extraction::Html(self.html(bytes).await?),
            OutputKind::Metadata => Extraction::Metadata(self.metadata(bytes).await?),
            OutputKind::Mimetype => Extraction::Mimetype(self.mimetype(bytes).await?),
        })
    }

    pub async fn text(&self, bytes: &[u8]) -> Result<String, BridgeError> {
        let raw = self.raw(OutputKind::Text, bytes).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    pub async fn html(&self, bytes: &[u8]) -> Result<String, BridgeError> {
        let raw = self.raw(OutputKind::Html, bytes).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    pub async fn metadata(&self, bytes: &[u8]) -> Result<Metadata, BridgeError> {
        let raw = self.raw(OutputKind::Metadata, bytes).await?;
        Metadata::from_json(&raw)
    }

    pub async fn mimetype(&self, bytes: &[u8]) -> Result<MimeType, BridgeError> {
        let raw = self.raw(OutputKind::Mimetype, bytes).await?;
        self.resolve_mimetype(&Metadata::from_json(&raw)?)
    }

    /// Look up the first `Content-Type` value in the registry.
    pub fn resolve_mimetype(&self, metadata: &Metadata) -> Result<MimeType, BridgeError> {
        let declared = metadata
            .content_type()
            .ok_or(BridgeError::MissingContentType)?;
        self.registry
            .lookup(declared)
            .ok_or_else(|| BridgeError::UnknownMimeType(declared.to_string()))
    }

    /// The engine's undecoded response.
    pub async fn raw(&self, kind: OutputKind, bytes: &[u8]) -> Result<Vec<u8>, BridgeError> {
        let started = Instant::now();
        let result = self.bridge.invoke(kind, bytes, self.timeout).await;
        match &result {
            Ok(out) => tracing::debug!(
                bridge = self.bridge.name(),
                kind = %kind,
                input = bytes.len(),
                output = out.len(),
                elapsed = ?started.elapsed(),
                "extraction complete"
            ),
            Err(e) => tracing::debug!(
                bridge = self.bridge.name(),
                kind = %kind,
                error = %e,
                "extraction failed"
            ),
        }
        result
    }
}
