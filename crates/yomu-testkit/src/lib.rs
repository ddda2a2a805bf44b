//! Output rules of the `fake-engine` binary, shared with the tests that
//! drive it.

use serde_json::{Map, Value, json};

pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const CREATION_DATE: &str = "2012-03-27T15:15:09Z";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    Text,
    Html,
    MetadataJson,
}

/// Produce the engine response for `input`.
pub fn render(mode: Render, input: &[u8]) -> Vec<u8> {
    match mode {
        Render::Text => text(input).into_bytes(),
        Render::Html => html(input).into_bytes(),
        Render::MetadataJson => metadata(input).to_string().into_bytes(),
    }
}

/// Readable text of the document: the bytes after any container magic.
pub fn text(input: &[u8]) -> String {
    let body = match sniff(input) {
        Sniffed::Pdf => &input[4..],
        Sniffed::Zip => &input[4..],
        _ => input,
    };
    String::from_utf8_lossy(body).trim_start_matches('-').to_string()
}

pub fn html(input: &[u8]) -> String {
    let escaped = text(input)
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!("<html><body><p>{escaped}</p></body></html>")
}

/// Flat metadata object in the engine's JSON shape.
///
/// Zip containers report `Content-Type` twice, as the real engine does for
/// OOXML documents.
pub fn metadata(input: &[u8]) -> Value {
    let mut map = Map::new();
    let content_type = match sniff(input) {
        Sniffed::Pdf => json!("application/pdf"),
        Sniffed::Zip => json!([DOCX, DOCX]),
        Sniffed::Html => json!("text/html; charset=UTF-8"),
        Sniffed::Plain => json!("text/plain; charset=UTF-8"),
    };
    map.insert("Content-Type".into(), content_type);
    map.insert("Content-Length".into(), json!(input.len().to_string()));
    map.insert("X-Parsed-By".into(), json!(["fake-engine"]));
    if let Some(title) = text(input).lines().map(str::trim).find(|l| !l.is_empty()) {
        map.insert("dc:title".into(), json!(title));
    }
    if matches!(sniff(input), Sniffed::Pdf | Sniffed::Zip) {
        map.insert("Creation-Date".into(), json!(CREATION_DATE));
    }
    Value::Object(map)
}

enum Sniffed {
    Pdf,
    Zip,
    Html,
    Plain,
}

fn sniff(input: &[u8]) -> Sniffed {
    if input.starts_with(b"%PDF") {
        Sniffed::Pdf
    } else if input.starts_with(b"PK\x03\x04") {
        Sniffed::Zip
    } else if input.trim_ascii_start().starts_with(b"<html") {
        Sniffed::Html
    } else {
        Sniffed::Plain
    }
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .unwrap_or(0)
}
