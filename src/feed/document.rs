//! Generic XML document values.
//!
//! Feed bodies are parsed into [`XmlValue`], a tagged sum type mirroring the
//! XML shape without any schema validation. Attributes are stored under
//! `"@<name>"` keys and mixed text under the `"#"` key, so an Atom entry like
//! `<gs:cell row="3" col="5">42</gs:cell>` becomes a map with `"@row"`,
//! `"@col"`, and `"#"` entries. Repeated child elements coerce to a sequence.

use crate::common::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesRef, BytesStart, Event};
use std::collections::BTreeMap;
use std::io::BufRead;

/// Key under which an element's text content is stored when the element
/// also carries attributes or child elements.
pub const TEXT_KEY: &str = "#";

/// A parsed XML document fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlValue {
    /// Absent or empty value
    Null,
    /// Plain text content
    Text(String),
    /// Repeated sibling elements
    Seq(Vec<XmlValue>),
    /// An element with attributes and/or child elements
    Map(BTreeMap<String, XmlValue>),
}

impl XmlValue {
    /// Look up a child element or attribute by key. Returns `None` for
    /// non-map values.
    pub fn get(&self, key: &str) -> Option<&XmlValue> {
        match self {
            XmlValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// The value as plain text, if it is a `Text` variant.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The element's text content: either the `Text` value itself or the
    /// `"#"` entry of an attributed element.
    pub fn text_content(&self) -> Option<&str> {
        match self {
            XmlValue::Text(text) => Some(text),
            XmlValue::Map(map) => map.get(TEXT_KEY).and_then(XmlValue::as_text),
            _ => None,
        }
    }

    /// An attribute value by name (without the `@` prefix).
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            XmlValue::Map(map) => map.get(&format!("@{name}")).and_then(XmlValue::as_text),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, XmlValue::Null)
    }
}

/// Parse an XML document into the value of its root element.
///
/// The returned value describes the root element's contents, so a feed
/// document yields a map holding `entry`, `title`, the OpenSearch counters,
/// and so on.
pub fn parse_document(xml: &str) -> Result<XmlValue> {
    let mut reader = Reader::from_reader(xml.as_bytes());

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let start = e.to_owned();
                return parse_element(&mut reader, &start);
            },
            Ok(Event::Empty(ref e)) => {
                return empty_element(e);
            },
            Ok(Event::Eof) => {
                return Err(Error::Parse("document has no root element".to_string()));
            },
            Err(e) => return Err(Error::Parse(format!("XML parsing error: {}", e))),
            _ => {
                // Skip the declaration, comments, and processing instructions
            },
        }
        buf.clear();
    }
}

/// Parse one element, consuming events up to and including its end tag.
fn parse_element<B: BufRead>(reader: &mut Reader<B>, start: &BytesStart<'_>) -> Result<XmlValue> {
    let mut map = attributes(start)?;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let child_start = e.to_owned();
                let name = element_name(&child_start)?;
                let child = parse_element(reader, &child_start)?;
                insert_child(&mut map, name, child);
            },
            Ok(Event::Empty(ref e)) => {
                let name = element_name(e)?;
                let child = empty_element(e)?;
                insert_child(&mut map, name, child);
            },
            Ok(Event::Text(ref e)) => {
                let content = e
                    .xml_content()
                    .map_err(|e| Error::Parse(format!("invalid text content: {}", e)))?;
                text.push_str(&content);
            },
            // Entity and character references arrive as their own events,
            // between the surrounding text pieces.
            Ok(Event::GeneralRef(ref e)) => {
                text.push_str(&resolve_reference(e)?);
            },
            Ok(Event::CData(ref e)) => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            },
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => {
                return Err(Error::Parse("unexpected end of document".to_string()));
            },
            Err(e) => return Err(Error::Parse(format!("XML parsing error: {}", e))),
            _ => {
                // Skip comments and processing instructions
            },
        }
        buf.clear();
    }

    // Trim after accumulation so whitespace around reference events survives,
    // while indentation between child elements still collapses to nothing.
    let text = text.trim();

    // A plain element with no attributes or children collapses to its text.
    if map.is_empty() {
        return Ok(XmlValue::Text(text.to_string()));
    }
    if !text.is_empty() {
        map.insert(TEXT_KEY.to_string(), XmlValue::Text(text.to_string()));
    }
    Ok(XmlValue::Map(map))
}

/// Resolve a character reference or one of the five predefined entities.
fn resolve_reference(e: &BytesRef<'_>) -> Result<String> {
    if let Some(ch) = e
        .resolve_char_ref()
        .map_err(|e| Error::Parse(format!("invalid character reference: {}", e)))?
    {
        return Ok(ch.to_string());
    }
    let name = e
        .decode()
        .map_err(|e| Error::Parse(format!("invalid entity reference: {}", e)))?;
    let resolved = match name.as_ref() {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "apos" => "'",
        "quot" => "\"",
        other => {
            return Err(Error::Parse(format!("unknown entity reference: &{other};")));
        },
    };
    Ok(resolved.to_string())
}

/// A self-closing element: attributes only, or empty text.
fn empty_element(start: &BytesStart<'_>) -> Result<XmlValue> {
    let map = attributes(start)?;
    if map.is_empty() {
        Ok(XmlValue::Text(String::new()))
    } else {
        Ok(XmlValue::Map(map))
    }
}

fn attributes(start: &BytesStart<'_>) -> Result<BTreeMap<String, XmlValue>> {
    let mut map = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Parse(format!("invalid attribute: {}", e)))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Parse(format!("invalid attribute value: {}", e)))?
            .into_owned();
        map.insert(format!("@{name}"), XmlValue::Text(value));
    }
    Ok(map)
}

fn element_name(start: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(start.name().as_ref())
        .map(str::to_string)
        .map_err(|e| Error::Parse(format!("invalid element name: {}", e)))
}

/// Insert a child value, coercing repeated names to a sequence.
fn insert_child(map: &mut BTreeMap<String, XmlValue>, name: String, child: XmlValue) {
    match map.get_mut(&name) {
        Some(XmlValue::Seq(items)) => items.push(child),
        Some(existing) => {
            let first = std::mem::replace(existing, XmlValue::Null);
            *existing = XmlValue::Seq(vec![first, child]);
        },
        None => {
            map.insert(name, child);
        },
    }
}
