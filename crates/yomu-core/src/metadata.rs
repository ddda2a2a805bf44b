//! Decoded engine metadata.
//!
//! The engine emits a flat JSON object whose values are either strings or
//! arrays of strings (container formats repeat fields such as
//! `Content-Type`). Values are kept verbatim; nothing here splits on `:`.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::BridgeError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CREATION_DATE: &str = "Creation-Date";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Single(String),
    Multi(Vec<String>),
}

impl MetadataValue {
    /// The value itself, or the first of a multi-valued field.
    pub fn first(&self) -> Option<&str> {
        match self {
            MetadataValue::Single(s) => Some(s),
            MetadataValue::Multi(values) => values.first().map(|s| s.as_str()),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            MetadataValue::Single(s) => vec![s.as_str()],
            MetadataValue::Multi(values) => values.iter().map(|s| s.as_str()).collect(),
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, MetadataValue::Multi(_))
    }

    fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) => MetadataValue::Multi(items.into_iter().map(scalar).collect()),
            other => MetadataValue::Single(scalar(other)),
        }
    }
}

fn scalar(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Metadata fields keyed by the engine's field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: BTreeMap<String, MetadataValue>,
}

impl Metadata {
    /// Decode the engine's `-m -j` response.
    pub fn from_json(raw: &[u8]) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_slice(raw)?;
        let Value::Object(map) = value else {
            return Err(BridgeError::NotAnObject);
        };
        let fields = map
            .into_iter()
            .map(|(key, value)| (key, MetadataValue::from_json(value)))
            .collect();
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.fields.get(key)
    }

    /// First value of `key`, whether single- or multi-valued.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.first(CONTENT_TYPE)
    }

    /// Parse `Creation-Date`; a missing field is `Ok(None)`.
    pub fn creation_date(&self) -> Result<Option<DateTime<FixedOffset>>, BridgeError> {
        match self.first(CREATION_DATE) {
            None => Ok(None),
            Some(raw) => parse_timestamp(raw).map(Some),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, MetadataValue)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, MetadataValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// RFC 3339 timestamps, or zone-less `YYYY-MM-DDTHH:MM:SS` read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, BridgeError> {
    let trimmed = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(date);
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|_| BridgeError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn decodes_single_and_multi_values() {
        let raw = br#"{
            "Content-Type": ["application/msword", "application/msword"],
            "Author": "Jane Doe",
            "Page-Count": 3
        }"#;
        let metadata = Metadata::from_json(raw).unwrap();
        assert_eq!(metadata.len(), 3);
        assert!(metadata.get("Content-Type").unwrap().is_multi());
        assert_eq!(metadata.content_type(), Some("application/msword"));
        assert_eq!(
            metadata.get("Author"),
            Some(&MetadataValue::Single("Jane Doe".into()))
        );
        assert_eq!(metadata.first("Page-Count"), Some("3"));
    }

    #[test]
    fn colons_are_preserved() {
        let raw = br#"{"dc:title": "problem: test", "meta:line-count": "1"}"#;
        let metadata = Metadata::from_json(raw).unwrap();
        assert_eq!(metadata.first("dc:title"), Some("problem: test"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Metadata::from_json(b"{\"Content-Type\": ").unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
    }

    #[test]
    fn rejects_non_object() {
        let err = Metadata::from_json(b"[\"a\"]").unwrap_err();
        assert!(matches!(err, BridgeError::NotAnObject));
    }

    #[test]
    fn creation_date_parses_rfc3339() {
        let metadata = Metadata::from_json(br#"{"Creation-Date": "2012-03-27T15:15:09Z"}"#).unwrap();
        let date = metadata.creation_date().unwrap().unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2012, 3, 27));
        assert_eq!((date.hour(), date.minute(), date.second()), (15, 15, 9));
    }

    #[test]
    fn creation_date_without_zone_is_utc() {
        let date = parse_timestamp("2014-01-02T03:04:05").unwrap();
        assert_eq!(date.offset().local_minus_utc(), 0);
        assert_eq!(date.hour(), 3);
    }

    #[test]
    fn missing_creation_date_is_none() {
        let metadata = Metadata::from_json(b"{}").unwrap();
        assert!(metadata.creation_date().unwrap().is_none());
    }

    #[test]
    fn garbage_creation_date_is_an_error() {
        let metadata = Metadata::from_json(br#"{"Creation-Date": "yesterday"}"#).unwrap();
        assert!(matches!(
            metadata.creation_date().unwrap_err(),
            BridgeError::InvalidDate(s) if s == "yesterday"
        ));
    }
}
