//! Spreadsheet discovery operations.

use super::worksheet::Worksheet;
use crate::common::{Error, Result};
use crate::feed::envelope::FeedEnvelope;
use crate::feed::{AuthProvider, FeedClient, FeedKind, HttpTransport, NoAuth, Transport, XmlValue};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// A remote spreadsheet, identified by its feed key.
///
/// Worksheets are produced on demand and never cached: every discovery call
/// re-fetches the worksheet feed. A successful discovery also refreshes the
/// spreadsheet's own metadata fields (`author`, `title`, `updated`,
/// `sheet_count`, `start_index`).
pub struct Spreadsheet<T = HttpTransport, A = NoAuth> {
    key: String,
    client: Arc<FeedClient<T, A>>,
    author: Option<String>,
    title: Option<String>,
    updated: Option<DateTime<Utc>>,
    sheet_count: Option<u32>,
    start_index: Option<u32>,
}

impl Spreadsheet {
    /// A public (unauthenticated) spreadsheet over the default transport.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        Spreadsheet::with_client(key, FeedClient::public())
    }
}

impl<T: Transport, A: AuthProvider> Spreadsheet<T, A> {
    /// A spreadsheet over a custom feed client, e.g. with an authenticated
    /// transport or tuned retry/timeout settings.
    pub fn with_client(key: impl Into<String>, client: FeedClient<T, A>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::Config("a spreadsheet must have a key".to_string()));
        }
        Ok(Spreadsheet {
            key,
            client: Arc::new(client),
            author: None,
            title: None,
            updated: None,
            sheet_count: None,
            start_index: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Author name from the last successful discovery.
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Title from the last successful discovery.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Update timestamp from the last successful discovery.
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// Worksheet count from the last successful discovery.
    pub fn sheet_count(&self) -> Option<u32> {
        self.sheet_count
    }

    /// Feed start index from the last successful discovery.
    pub fn start_index(&self) -> Option<u32> {
        self.start_index
    }

    /// Retrieve all worksheets, in feed order with 1-based indices.
    pub async fn worksheets(&mut self) -> Result<Vec<Worksheet<T, A>>> {
        let envelope = self.load().await?;
        let mut sheets = Vec::with_capacity(envelope.entries.len());
        for (offset, entry) in envelope.entries.iter().enumerate() {
            sheets.push(self.worksheet_from_entry(entry, offset as u32 + 1)?);
        }
        Ok(sheets)
    }

    /// Retrieve a single worksheet by 1-based index or by id.
    pub async fn worksheet(
        &mut self,
        selector: impl Into<WorksheetSelector>,
    ) -> Result<Worksheet<T, A>> {
        let selector = selector.into();
        let envelope = self.load().await?;
        match &selector {
            WorksheetSelector::Index(index) => {
                let index = *index;
                if index >= 1 && (index as usize) <= envelope.entries.len() {
                    return self.worksheet_from_entry(&envelope.entries[index as usize - 1], index);
                }
            },
            WorksheetSelector::Id(id) => {
                for (offset, entry) in envelope.entries.iter().enumerate() {
                    if worksheet_id(entry) == Some(id.as_str()) {
                        return self.worksheet_from_entry(entry, offset as u32 + 1);
                    }
                }
            },
        }
        Err(Error::NotFound(format!("no worksheet matching {selector}")))
    }

    /// Fetch the worksheet feed and refresh the spreadsheet metadata.
    async fn load(&mut self) -> Result<FeedEnvelope> {
        let doc = self
            .client
            .fetch_feed(FeedKind::Worksheets, &self.key, None, None)
            .await?;
        let envelope = FeedEnvelope::from_document(doc);
        self.author = envelope.author.clone();
        self.title = envelope.title.clone();
        self.updated = envelope.updated;
        self.sheet_count = envelope.total_results;
        self.start_index = envelope.start_index;
        Ok(envelope)
    }

    fn worksheet_from_entry(&self, entry: &XmlValue, index: u32) -> Result<Worksheet<T, A>> {
        let id = worksheet_id(entry)
            .ok_or_else(|| Error::Config("a worksheet must have an id".to_string()))?;
        Worksheet::from_parts(
            Arc::clone(&self.client),
            self.key.clone(),
            id.to_string(),
            index,
            entry.get("title").and_then(XmlValue::text_content).map(str::to_string),
            entry
                .get("updated")
                .and_then(XmlValue::text_content)
                .and_then(crate::feed::envelope::parse_timestamp),
        )
    }
}

/// How to pick a single worksheet out of the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorksheetSelector {
    /// 1-based position among sibling worksheets
    Index(u32),
    /// The worksheet id extracted from the entry id URL
    Id(String),
}

impl From<u32> for WorksheetSelector {
    fn from(index: u32) -> Self {
        WorksheetSelector::Index(index)
    }
}

impl From<&str> for WorksheetSelector {
    fn from(id: &str) -> Self {
        WorksheetSelector::Id(id.to_string())
    }
}

impl From<String> for WorksheetSelector {
    fn from(id: String) -> Self {
        WorksheetSelector::Id(id)
    }
}

impl fmt::Display for WorksheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorksheetSelector::Index(index) => write!(f, "index {index}"),
            WorksheetSelector::Id(id) => write!(f, "id {id}"),
        }
    }
}

/// The worksheet id is the trailing word-character run of the entry id URL.
fn worksheet_id(entry: &XmlValue) -> Option<&str> {
    let url = entry.get("id").and_then(XmlValue::text_content)?;
    trailing_id(url)
}

fn trailing_id(url: &str) -> Option<&str> {
    let bytes = url.as_bytes();
    let mut start = bytes.len();
    while start > 0 && (bytes[start - 1].is_ascii_alphanumeric() || bytes[start - 1] == b'_') {
        start -= 1;
    }
    if start == bytes.len() {
        None
    } else {
        Some(&url[start..])
    }
}
