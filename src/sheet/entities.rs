//! Row, Cell, and Meta entity mappers.
//!
//! Pure per-entry constructors: each entity derives from a single feed entry
//! plus, for enumeration metadata, the feed-level pagination counters.

use crate::common::{Error, Result};
use crate::feed::XmlValue;
use crate::feed::envelope::{FeedEnvelope, parse_timestamp};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Namespace prefix of row-feed column fields.
const COLUMN_PREFIX: &str = "gsx:";
/// Entry field holding a cell-feed entry's coordinates and content.
const CELL_FIELD: &str = "gs:cell";

/// A row as a flat mapping from column name to cell value.
///
/// Column names are the entry's `gsx:`-prefixed fields with the prefix
/// stripped; empty values become [`XmlValue::Null`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: BTreeMap<String, XmlValue>,
}

impl Row {
    /// Build a row from a list-feed entry.
    pub fn from_entry(entry: &XmlValue) -> Row {
        let mut fields = BTreeMap::new();
        if let XmlValue::Map(map) = entry {
            for (key, value) in map {
                if let Some(name) = key.strip_prefix(COLUMN_PREFIX) {
                    fields.insert(name.to_string(), cell_value(value));
                }
            }
        }
        Row { fields }
    }

    /// The value of a column, `None` if the column is absent entirely.
    pub fn get(&self, column: &str) -> Option<&XmlValue> {
        self.fields.get(column)
    }

    /// Column names in sorted order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A single cell with 1-based coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    pub value: XmlValue,
}

impl Cell {
    /// Build a cell from a cells-feed entry.
    pub fn from_entry(entry: &XmlValue) -> Result<Cell> {
        let cell = entry
            .get(CELL_FIELD)
            .ok_or_else(|| Error::Parse("entry has no gs:cell element".to_string()))?;
        let row = coordinate(cell, "row")?;
        let col = coordinate(cell, "col")?;
        let value = match cell.get(crate::feed::document::TEXT_KEY) {
            Some(text) => cell_value(text),
            None => XmlValue::Null,
        };
        Ok(Cell { row, col, value })
    }

    /// The `R<row>C<col>` token addressing this cell.
    pub fn token(&self) -> String {
        format!("R{}C{}", self.row, self.col)
    }
}

fn coordinate(cell: &XmlValue, name: &str) -> Result<u32> {
    cell.attr(name)
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| Error::Parse(format!("gs:cell has no numeric {name} attribute")))
}

/// Per-entry metadata: the raw entry id (usable for later point lookups),
/// the update timestamp, and, when produced by an enumeration, the entry's
/// absolute position and the feed's reported total.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    pub id: String,
    pub updated: Option<DateTime<Utc>>,
    pub index: Option<u32>,
    pub total: Option<u32>,
}

impl Meta {
    /// Metadata for a single-entry fetch; no position counters.
    pub fn from_entry(entry: &XmlValue) -> Result<Meta> {
        Ok(Meta {
            id: entry_id(entry)?,
            updated: entry
                .get("updated")
                .and_then(XmlValue::text_content)
                .and_then(parse_timestamp),
            index: None,
            total: None,
        })
    }

    /// Metadata for the entry at `offset` within an enumerated feed.
    pub fn from_feed_entry(entry: &XmlValue, envelope: &FeedEnvelope, offset: u32) -> Result<Meta> {
        let mut meta = Meta::from_entry(entry)?;
        meta.index = envelope.start_index.map(|start| start + offset);
        meta.total = envelope.total_results;
        Ok(meta)
    }
}

pub(crate) fn entry_id(entry: &XmlValue) -> Result<String> {
    entry
        .get("id")
        .and_then(XmlValue::text_content)
        .map(str::to_string)
        .ok_or_else(|| Error::Parse("entry has no id".to_string()))
}

/// Coerce empty values to null: an empty string, sequence, or mapping all
/// mean "no content" in the feed.
pub(crate) fn cell_value(value: &XmlValue) -> XmlValue {
    match value {
        XmlValue::Null => XmlValue::Null,
        XmlValue::Text(text) if text.is_empty() => XmlValue::Null,
        XmlValue::Seq(items) if items.is_empty() => XmlValue::Null,
        XmlValue::Map(map) if map.is_empty() => XmlValue::Null,
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::document::parse_document;

    #[test]
    fn row_strips_the_column_prefix_and_nulls_empty_fields() {
        let entry = parse_document(
            "<entry><id>x</id><gsx:foo>bar</gsx:foo><gsx:baz></gsx:baz></entry>",
        )
        .unwrap();
        let row = Row::from_entry(&entry);
        assert_eq!(row.get("foo"), Some(&XmlValue::Text("bar".to_string())));
        assert_eq!(row.get("baz"), Some(&XmlValue::Null));
        assert_eq!(row.get("id"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn cell_maps_coordinates_and_content() {
        let entry =
            parse_document(r#"<entry><gs:cell row="3" col="5">42</gs:cell></entry>"#).unwrap();
        let cell = Cell::from_entry(&entry).unwrap();
        assert_eq!(cell.row, 3);
        assert_eq!(cell.col, 5);
        assert_eq!(cell.value, XmlValue::Text("42".to_string()));
        assert_eq!(cell.token(), "R3C5");
    }

    #[test]
    fn empty_cell_content_is_null() {
        let entry =
            parse_document(r#"<entry><gs:cell row="1" col="1"></gs:cell></entry>"#).unwrap();
        let cell = Cell::from_entry(&entry).unwrap();
        assert_eq!(cell.value, XmlValue::Null);
    }

    #[test]
    fn entry_without_gs_cell_is_a_parse_error() {
        let entry = parse_document("<entry><id>x</id></entry>").unwrap();
        assert!(matches!(Cell::from_entry(&entry), Err(Error::Parse(_))));
    }

    #[test]
    fn meta_carries_id_and_counters() {
        let doc = parse_document(
            "<feed><openSearch:startIndex>11</openSearch:startIndex>\
             <openSearch:totalResults>40</openSearch:totalResults>\
             <entry><id>tag:row7</id><updated>2024-03-01T10:00:00Z</updated></entry></feed>",
        )
        .unwrap();
        let envelope = FeedEnvelope::from_document(doc);
        let meta = Meta::from_feed_entry(&envelope.entries[0], &envelope, 2).unwrap();
        assert_eq!(meta.id, "tag:row7");
        assert_eq!(meta.index, Some(13));
        assert_eq!(meta.total, Some(40));
        assert!(meta.updated.is_some());
    }

    #[test]
    fn single_entry_meta_has_no_counters() {
        let entry = parse_document("<entry><id>tag:row7</id></entry>").unwrap();
        let meta = Meta::from_entry(&entry).unwrap();
        assert_eq!(meta.index, None);
        assert_eq!(meta.total, None);
        assert_eq!(meta.updated, None);
    }

    #[test]
    fn cell_value_coercions() {
        assert_eq!(cell_value(&XmlValue::Text(String::new())), XmlValue::Null);
        assert_eq!(cell_value(&XmlValue::Seq(Vec::new())), XmlValue::Null);
        assert_eq!(cell_value(&XmlValue::Map(BTreeMap::new())), XmlValue::Null);
        assert_eq!(
            cell_value(&XmlValue::Text("x".to_string())),
            XmlValue::Text("x".to_string())
        );
    }
}
