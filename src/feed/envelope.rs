//! Normalization of parsed feed documents.
//!
//! The Atom feed shape (entry coercion, OpenSearch counters, author/title
//! extraction) is fragile, so it is isolated here: everything above this
//! adapter works with a typed [`FeedEnvelope`] instead of poking at the raw
//! document.

use super::document::XmlValue;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;

/// A feed document normalized into its typed parts.
#[derive(Debug, Clone, Default)]
pub struct FeedEnvelope {
    /// Feed title text
    pub title: Option<String>,
    /// Author name text
    pub author: Option<String>,
    /// Feed-level update timestamp
    pub updated: Option<DateTime<Utc>>,
    /// OpenSearch start index of the first entry
    pub start_index: Option<u32>,
    /// OpenSearch total result count
    pub total_results: Option<u32>,
    /// Feed entries, coerced to a sequence unconditionally
    pub entries: Vec<XmlValue>,
}

impl FeedEnvelope {
    /// Normalize a parsed feed document, consuming it.
    pub fn from_document(doc: XmlValue) -> Self {
        let mut map = match doc {
            XmlValue::Map(map) => map,
            _ => BTreeMap::new(),
        };

        // The entry field holds a single map for one-entry feeds; always
        // coerce to a sequence.
        let entries = match map.remove("entry") {
            Some(XmlValue::Seq(items)) => items,
            Some(XmlValue::Null) | None => Vec::new(),
            Some(single) => vec![single],
        };

        FeedEnvelope {
            title: map.get("title").and_then(XmlValue::text_content).map(str::to_string),
            author: author_name(map.get("author")),
            updated: map
                .get("updated")
                .and_then(XmlValue::text_content)
                .and_then(parse_timestamp),
            start_index: counter(map.get("openSearch:startIndex")),
            total_results: counter(map.get("openSearch:totalResults")),
            entries,
        }
    }
}

fn counter(value: Option<&XmlValue>) -> Option<u32> {
    value
        .and_then(XmlValue::text_content)
        .and_then(|text| text.trim().parse().ok())
}

fn author_name(value: Option<&XmlValue>) -> Option<String> {
    let value = value?;
    match value {
        XmlValue::Map(_) => value
            .get("name")
            .and_then(XmlValue::text_content)
            .map(str::to_string),
        _ => value.text_content().map(str::to_string),
    }
}

/// Parse a feed timestamp into a `DateTime<Utc>`.
///
/// Supports RFC 3339 (the Atom `updated` format) with naive-datetime
/// fallbacks; unparseable input yields `None` rather than an error, matching
/// the lenient handling of timestamps everywhere in the feed.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ") {
        return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
    }

    None
}
