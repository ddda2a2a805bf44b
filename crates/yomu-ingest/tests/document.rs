//! Document construction, source fetching and memoisation.
//!
//! The engine is replaced by in-process bridges so these tests exercise the
//! document layer alone.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use yomu_core::mock::{MockBridge, MockResponse};
use yomu_core::{Bridge, BridgeFuture, Extractor, OutputKind};
use yomu_ingest::{ConstructionError, Document, IngestError};

const SAMPLE: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.";

/// Returns the document bytes as the "text" and counts calls.
#[derive(Default)]
struct EchoBridge {
    calls: AtomicUsize,
}

impl Bridge for EchoBridge {
    fn name(&self) -> &str {
        "echo"
    }

    fn invoke<'a>(
        &'a self,
        _kind: OutputKind,
        bytes: &'a [u8],
        _timeout: Option<Duration>,
    ) -> BridgeFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(bytes.to_vec()) })
    }
}

fn echo() -> (Arc<EchoBridge>, Extractor) {
    let bridge = Arc::new(EchoBridge::default());
    (bridge.clone(), Extractor::new(bridge))
}

fn sample_file() -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), SAMPLE).unwrap();
    file
}

/// One-shot HTTP/1.1 server returning `body` for any request.
async fn serve_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut conn, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = conn.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        conn.write_all(response.as_bytes()).await.unwrap();
        conn.shutdown().await.unwrap();
    });
    format!("http://{addr}/sample.txt")
}

#[tokio::test]
async fn every_source_kind_yields_the_same_text() {
    let file = sample_file();
    let (_, extractor) = echo();

    let from_path = Document::open(file.path().to_str().unwrap(), extractor.clone()).unwrap();
    assert!(from_path.is_path());

    let url = serve_once(SAMPLE).await;
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let from_uri = Document::open(&url, extractor.clone())
        .unwrap()
        .with_client(client);
    assert!(from_uri.is_uri());

    let stream = tokio::fs::File::open(file.path()).await.unwrap();
    let from_stream = Document::from_reader(stream, extractor);
    assert!(from_stream.is_stream());

    for doc in [&from_path, &from_uri, &from_stream] {
        let text = doc.text().await.unwrap();
        assert!(text.contains("consectetur adipiscing"), "{doc:?}: {text}");
    }
}

#[tokio::test]
async fn missing_file_fails_at_construction() {
    let (bridge, extractor) = echo();
    let err = Document::open("test/documents/missing.docx", extractor).unwrap_err();
    assert!(matches!(err, ConstructionError::NotFound(_)));
    assert_eq!(bridge.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unsupported_input_fails_at_construction() {
    let (_, extractor) = echo();
    let err = Document::open("ftp://example.com/file.doc", extractor).unwrap_err();
    assert!(err.is_unsupported());
}

#[tokio::test]
async fn repeated_reads_hit_the_cache() {
    let bridge = Arc::new(
        MockBridge::new()
            .with_bytes(OutputKind::Text, "cached text")
            .with_bytes(
                OutputKind::Metadata,
                r#"{"Content-Type": "application/pdf", "Creation-Date": "2012-03-27T15:15:09Z"}"#,
            ),
    );
    let doc = Document::from_bytes(b"%PDF-1.4".to_vec(), Extractor::new(bridge.clone()));

    assert_eq!(doc.text().await.unwrap(), "cached text");
    assert_eq!(doc.text().await.unwrap(), "cached text");
    assert_eq!(bridge.calls_for(OutputKind::Text), 1);

    let first = doc.metadata().await.unwrap().clone();
    let second = doc.metadata().await.unwrap();
    assert_eq!(&first, second);
    assert_eq!(bridge.calls_for(OutputKind::Metadata), 1);

    // Derived from the cached metadata: no further engine calls.
    assert_eq!(doc.mimetype().await.unwrap().content_type, "application/pdf");
    assert!(doc.creation_date().await.unwrap().is_some());
    assert_eq!(bridge.calls_for(OutputKind::Mimetype), 0);
    assert_eq!(bridge.call_count(), 2);
}

#[tokio::test]
async fn read_by_kind_shares_the_cache() {
    let bridge = Arc::new(MockBridge::new().with_bytes(OutputKind::Html, "<p>hi</p>"));
    let doc = Document::from_bytes(b"hi".to_vec(), Extractor::new(bridge.clone()));
    doc.read(OutputKind::Html).await.unwrap();
    assert_eq!(doc.html().await.unwrap(), "<p>hi</p>");
    assert_eq!(bridge.call_count(), 1);
}

#[tokio::test]
async fn missing_creation_date_is_none() {
    let bridge = Arc::new(MockBridge::new().with_bytes(OutputKind::Metadata, "{}"));
    let doc = Document::from_bytes(b"x".to_vec(), Extractor::new(bridge));
    assert_eq!(doc.creation_date().await.unwrap(), None);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let bridge = Arc::new(MockBridge::new().with_response(OutputKind::Text, MockResponse::Refused));
    let doc = Document::from_bytes(b"x".to_vec(), Extractor::new(bridge.clone()));
    assert!(matches!(doc.text().await.unwrap_err(), IngestError::Bridge(_)));
    assert!(doc.text().await.is_err());
    assert_eq!(bridge.call_count(), 2);
    // The bytes themselves were fetched once and kept.
    assert_eq!(doc.data().await.unwrap(), b"x");
}

#[tokio::test]
async fn timeouts_surface_as_timeouts() {
    let bridge = Arc::new(MockBridge::new().with_response(OutputKind::Text, MockResponse::Timeout));
    let doc = Document::from_bytes(b"x".to_vec(), Extractor::new(bridge));
    assert!(doc.text().await.unwrap_err().is_timeout());
}
