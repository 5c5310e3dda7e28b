//! Placeholder-token substitution over nested JSON structures.
//!
//! Leaf strings of the form `R<row>C<col>` address cells. The resolver
//! collects the distinct token set from a structure, fetches each token's
//! cell once, and rewrites a copy with the resolved values. The fetch
//! fan-out itself lives in [`Worksheet::map_cells`](super::Worksheet::map_cells);
//! everything here is pure.

use super::entities::Cell;
use crate::feed::XmlValue;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Whether a string is a well-formed `R<row>C<col>` placeholder token.
///
/// Purely syntactic: both coordinate parts must be non-empty digit runs.
/// The token is passed verbatim as the cell feed's entry id, so no numeric
/// range is enforced here.
pub fn is_token(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('R') else {
        return false;
    };
    let Some(split) = rest.find('C') else {
        return false;
    };
    let (row, col) = (&rest[..split], &rest[split + 1..]);
    !row.is_empty()
        && !col.is_empty()
        && row.bytes().all(|b| b.is_ascii_digit())
        && col.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a token into its 1-based `(row, col)` pair.
pub fn parse_token(s: &str) -> Option<(u32, u32)> {
    if !is_token(s) {
        return None;
    }
    let rest = &s[1..];
    let split = rest.find('C')?;
    Some((rest[..split].parse().ok()?, rest[split + 1..].parse().ok()?))
}

/// Collect the set of distinct placeholder tokens in a structure.
///
/// Duplicates collapse, so each token is fetched exactly once regardless of
/// how often it occurs.
pub(crate) fn collect_tokens(value: &Value) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    walk_collect(value, &mut tokens);
    tokens
}

fn walk_collect(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            if is_token(s) {
                out.insert(s.clone());
            }
        },
        Value::Array(items) => {
            for item in items {
                walk_collect(item, out);
            }
        },
        Value::Object(map) => {
            for item in map.values() {
                walk_collect(item, out);
            }
        },
        _ => {},
    }
}

/// Rewrite every string leaf matching a resolved token in place.
///
/// Non-string and non-container leaves are left untouched.
pub(crate) fn substitute<F>(value: &mut Value, cells: &BTreeMap<&str, Cell>, modifier: &F)
where
    F: Fn(&Cell) -> Value,
{
    match value {
        Value::String(s) => {
            if let Some(cell) = cells.get(s.as_str()) {
                *value = modifier(cell);
            }
        },
        Value::Array(items) => {
            for item in items {
                substitute(item, cells, modifier);
            }
        },
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute(item, cells, modifier);
            }
        },
        _ => {},
    }
}

/// Default replacement: the resolved cell's raw value as JSON.
pub(crate) fn cell_to_json(cell: &Cell) -> Value {
    xml_to_json(&cell.value)
}

fn xml_to_json(value: &XmlValue) -> Value {
    match value {
        XmlValue::Null => Value::Null,
        XmlValue::Text(text) => Value::String(text.clone()),
        XmlValue::Seq(items) => Value::Array(items.iter().map(xml_to_json).collect()),
        XmlValue::Map(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), xml_to_json(value)))
                .collect(),
        ),
    }
}
