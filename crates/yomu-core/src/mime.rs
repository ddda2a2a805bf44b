use serde::Serialize;

/// A registered media type and the file extensions associated with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MimeType {
    /// Canonical `type/subtype`, lower-cased and without parameters.
    pub content_type: String,
    pub extensions: Vec<String>,
}

impl MimeType {
    /// Case-insensitive, tolerates a leading dot.
    pub fn has_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn preferred_extension(&self) -> Option<&str> {
        self.extensions.first().map(|s| s.as_str())
    }
}

/// Lookup from a `Content-Type` string to a registered type.
pub trait MimeRegistry: Send + Sync {
    fn lookup(&self, content_type: &str) -> Option<MimeType>;
}

/// Registry backed by the `mime_guess` tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuessRegistry;

impl MimeRegistry for GuessRegistry {
    fn lookup(&self, content_type: &str) -> Option<MimeType> {
        let essence = essence(content_type)?;
        let extensions = mime_guess::get_mime_extensions_str(&essence)?;
        Some(MimeType {
            content_type: essence,
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        })
    }
}

/// `type/subtype` with parameters stripped, e.g. `text/plain; charset=UTF-8`
/// becomes `text/plain`.
pub fn essence(content_type: &str) -> Option<String> {
    let base = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match base.split_once('/') {
        Some((top, sub)) if !top.is_empty() && !sub.is_empty() => Some(base),
        _ => None,
    }
}
