//! Worksheet row/cell operations and placeholder resolution.

use super::entities::{Cell, Meta, Row};
use super::template;
use crate::common::{Error, Result};
use crate::feed::envelope::FeedEnvelope;
use crate::feed::{AuthProvider, FeedClient, FeedKind, HttpTransport, NoAuth, Transport, XmlValue};
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One worksheet of a spreadsheet.
///
/// Only constructible through [`Spreadsheet`](super::Spreadsheet) discovery,
/// so every worksheet belongs to a spreadsheet by construction. Loads
/// produce fresh entities each call; nothing is cached.
pub struct Worksheet<T = HttpTransport, A = NoAuth> {
    client: Arc<FeedClient<T, A>>,
    spreadsheet_key: String,
    id: String,
    index: u32,
    title: Option<String>,
    updated: Option<DateTime<Utc>>,
}

impl<T: Transport, A: AuthProvider> Worksheet<T, A> {
    pub(crate) fn from_parts(
        client: Arc<FeedClient<T, A>>,
        spreadsheet_key: String,
        id: String,
        index: u32,
        title: Option<String>,
        updated: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if id.is_empty() {
            return Err(Error::Config("a worksheet must have an id".to_string()));
        }
        Ok(Worksheet {
            client,
            spreadsheet_key,
            id,
            index,
            title,
            updated,
        })
    }

    /// The worksheet id extracted from its feed entry.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 1-based position among sibling worksheets.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// Key of the owning spreadsheet.
    pub fn spreadsheet_key(&self) -> &str {
        &self.spreadsheet_key
    }

    /// All rows of the worksheet, each paired with its entry metadata.
    pub async fn rows(&self) -> Result<Vec<(Row, Meta)>> {
        let envelope = self.load(FeedKind::List).await?;
        if envelope.entries.is_empty() {
            return Err(Error::EmptyFeed);
        }
        let mut rows = Vec::with_capacity(envelope.entries.len());
        for (offset, entry) in envelope.entries.iter().enumerate() {
            rows.push((
                Row::from_entry(entry),
                Meta::from_feed_entry(entry, &envelope, offset as u32)?,
            ));
        }
        Ok(rows)
    }

    /// A single row by its feed entry id (as reported in [`Meta::id`]).
    pub async fn row(&self, entry_id: &str) -> Result<(Row, Meta)> {
        let entry = self.load_entry(FeedKind::List, entry_id).await?;
        Ok((Row::from_entry(&entry), Meta::from_entry(&entry)?))
    }

    /// All cells of the worksheet, each paired with its entry metadata.
    pub async fn cells(&self) -> Result<Vec<(Cell, Meta)>> {
        let envelope = self.load(FeedKind::Cells).await?;
        if envelope.entries.is_empty() {
            return Err(Error::EmptyFeed);
        }
        let mut cells = Vec::with_capacity(envelope.entries.len());
        for (offset, entry) in envelope.entries.iter().enumerate() {
            cells.push((
                Cell::from_entry(entry)?,
                Meta::from_feed_entry(entry, &envelope, offset as u32)?,
            ));
        }
        Ok(cells)
    }

    /// A single cell by its feed entry id.
    ///
    /// This id scheme is feed-defined and independent of the `R<row>C<col>`
    /// token format, although the cell feed happens to accept tokens as
    /// entry ids.
    pub async fn cell(&self, entry_id: &str) -> Result<(Cell, Meta)> {
        let entry = self.load_entry(FeedKind::Cells, entry_id).await?;
        Ok((Cell::from_entry(&entry)?, Meta::from_entry(&entry)?))
    }

    /// Resolve every `R<row>C<col>` placeholder token in a nested structure.
    ///
    /// Returns a structurally identical copy where each placeholder leaf is
    /// replaced by the resolved cell's value. Each distinct token is fetched
    /// exactly once, all fetches run concurrently, and the first failure
    /// fails the whole operation (dropping the remaining in-flight fetches).
    /// A structure without tokens completes immediately with an unchanged
    /// copy.
    pub async fn map_cells(&self, value: &Value) -> Result<Value> {
        self.map_cells_with(value, template::cell_to_json).await
    }

    /// Like [`map_cells`](Self::map_cells), but each replacement value is
    /// produced by `modifier` from the resolved [`Cell`].
    pub async fn map_cells_with<F>(&self, value: &Value, modifier: F) -> Result<Value>
    where
        F: Fn(&Cell) -> Value,
    {
        let mut copy = value.clone();
        let tokens: Vec<String> = template::collect_tokens(value).into_iter().collect();
        if tokens.is_empty() {
            return Ok(copy);
        }

        // Issue every fetch before awaiting any of them.
        let fetches = tokens.iter().map(|token| self.cell(token));
        let resolved = try_join_all(fetches).await?;

        let cells: BTreeMap<&str, Cell> = tokens
            .iter()
            .map(String::as_str)
            .zip(resolved.into_iter().map(|(cell, _)| cell))
            .collect();
        template::substitute(&mut copy, &cells, &modifier);
        Ok(copy)
    }

    async fn load(&self, kind: FeedKind) -> Result<FeedEnvelope> {
        let doc = self
            .client
            .fetch_feed(kind, &self.spreadsheet_key, Some(&self.id), None)
            .await?;
        Ok(FeedEnvelope::from_document(doc))
    }

    /// Fetch a feed scoped to a single entry; the response document is the
    /// entry itself.
    async fn load_entry(&self, kind: FeedKind, entry_id: &str) -> Result<XmlValue> {
        let doc = self
            .client
            .fetch_feed(kind, &self.spreadsheet_key, Some(&self.id), Some(entry_id))
            .await?;
        if doc.get("id").and_then(XmlValue::text_content).is_none() {
            return Err(Error::NotFound(format!(
                "no {} entry with id {entry_id}",
                kind.segment()
            )));
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedConfig;
    use crate::feed::client::mock::{MockAuth, MockTransport};
    use serde_json::json;

    const LIST_FEED: &str = r#"<feed>
  <openSearch:totalResults>2</openSearch:totalResults>
  <openSearch:startIndex>1</openSearch:startIndex>
  <entry>
    <id>https://spreadsheets.google.com/feeds/list/key123/od6/public/values/cokwr</id>
    <updated>2024-03-01T10:00:00.000Z</updated>
    <gsx:name>alice</gsx:name>
    <gsx:score>10</gsx:score>
  </entry>
  <entry>
    <id>https://spreadsheets.google.com/feeds/list/key123/od6/public/values/cpzh4</id>
    <updated>2024-03-01T10:00:00.000Z</updated>
    <gsx:name>bob</gsx:name>
    <gsx:score></gsx:score>
  </entry>
</feed>"#;

    const CELLS_FEED: &str = r#"<feed>
  <openSearch:totalResults>2</openSearch:totalResults>
  <openSearch:startIndex>1</openSearch:startIndex>
  <entry>
    <id>https://spreadsheets.google.com/feeds/cells/key123/od6/public/values/R1C1</id>
    <updated>2024-03-01T10:00:00.000Z</updated>
    <gs:cell row="1" col="1">name</gs:cell>
  </entry>
  <entry>
    <id>https://spreadsheets.google.com/feeds/cells/key123/od6/public/values/R1C2</id>
    <updated>2024-03-01T10:00:00.000Z</updated>
    <gs:cell row="1" col="2">score</gs:cell>
  </entry>
</feed>"#;

    const EMPTY_FEED: &str =
        "<feed><openSearch:totalResults>0</openSearch:totalResults></feed>";

    fn cell_entry(token: &str, row: u32, col: u32, value: &str) -> String {
        format!(
            r#"<entry>
  <id>https://spreadsheets.google.com/feeds/cells/key123/od6/public/values/{token}</id>
  <updated>2024-03-01T10:00:00.000Z</updated>
  <gs:cell row="{row}" col="{col}">{value}</gs:cell>
</entry>"#
        )
    }

    fn worksheet(transport: MockTransport) -> Worksheet<MockTransport, MockAuth> {
        let client = FeedClient::new(transport, None, FeedConfig::default());
        Worksheet::from_parts(
            Arc::new(client),
            "key123".to_string(),
            "od6".to_string(),
            1,
            Some("Sheet1".to_string()),
            None,
        )
        .expect("valid worksheet")
    }

    #[test]
    fn an_empty_id_is_a_config_error() {
        let client = FeedClient::new(MockTransport::new(), None::<MockAuth>, FeedConfig::default());
        let result = Worksheet::from_parts(
            Arc::new(client),
            "key123".to_string(),
            String::new(),
            1,
            None,
            None,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn rows_maps_entries_with_positional_meta() {
        let transport = MockTransport::new();
        transport.push(200, LIST_FEED);
        let worksheet = worksheet(transport.clone());

        let rows = worksheet.rows().await.expect("rows");
        assert_eq!(rows.len(), 2);

        let (row, meta) = &rows[0];
        assert_eq!(row.get("name"), Some(&XmlValue::Text("alice".to_string())));
        assert_eq!(row.get("score"), Some(&XmlValue::Text("10".to_string())));
        assert_eq!(meta.index, Some(1));
        assert_eq!(meta.total, Some(2));

        let (row, meta) = &rows[1];
        assert_eq!(row.get("score"), Some(&XmlValue::Null));
        assert_eq!(meta.index, Some(2));
        assert!(meta.id.ends_with("cpzh4"));

        let (url, _) = transport.requests().remove(0);
        assert_eq!(
            url,
            "https://spreadsheets.google.com/feeds/list/key123/od6/public/values?hl=en"
        );
    }

    #[tokio::test]
    async fn an_entryless_list_feed_is_empty() {
        let transport = MockTransport::new();
        transport.push(200, EMPTY_FEED);
        let worksheet = worksheet(transport);

        assert!(matches!(worksheet.rows().await, Err(Error::EmptyFeed)));
    }

    #[tokio::test]
    async fn row_by_id_fetches_a_scoped_entry() {
        let transport = MockTransport::new();
        transport.push(
            200,
            r#"<entry>
  <id>https://spreadsheets.google.com/feeds/list/key123/od6/public/values/cokwr</id>
  <updated>2024-03-01T10:00:00.000Z</updated>
  <gsx:name>alice</gsx:name>
</entry>"#,
        );
        let worksheet = worksheet(transport.clone());

        let (row, meta) = worksheet.row("cokwr").await.expect("row");
        assert_eq!(row.get("name"), Some(&XmlValue::Text("alice".to_string())));
        assert!(meta.id.ends_with("cokwr"));
        assert_eq!(meta.index, None);

        let (url, _) = transport.requests().remove(0);
        assert_eq!(
            url,
            "https://spreadsheets.google.com/feeds/list/key123/od6/public/values/cokwr?hl=en"
        );
    }

    #[tokio::test]
    async fn scoped_fetch_without_an_entry_is_not_found() {
        let transport = MockTransport::new();
        transport.push(200, "<entry></entry>");
        let worksheet = worksheet(transport);

        assert!(matches!(
            worksheet.row("missing").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cells_maps_coordinates_and_meta() {
        let transport = MockTransport::new();
        transport.push(200, CELLS_FEED);
        let worksheet = worksheet(transport);

        let cells = worksheet.cells().await.expect("cells");
        assert_eq!(cells.len(), 2);
        let (cell, meta) = &cells[0];
        assert_eq!((cell.row, cell.col), (1, 1));
        assert_eq!(cell.value, XmlValue::Text("name".to_string()));
        assert_eq!(meta.index, Some(1));
        let (cell, _) = &cells[1];
        assert_eq!((cell.row, cell.col), (1, 2));
    }

    #[tokio::test]
    async fn cell_by_id() {
        let transport = MockTransport::new();
        transport.push(200, &cell_entry("R3C5", 3, 5, "42"));
        let worksheet = worksheet(transport);

        let (cell, meta) = worksheet.cell("R3C5").await.expect("cell");
        assert_eq!((cell.row, cell.col), (3, 5));
        assert_eq!(cell.value, XmlValue::Text("42".to_string()));
        assert!(meta.id.ends_with("R3C5"));
    }

    #[tokio::test]
    async fn map_cells_substitutes_and_deduplicates() {
        let transport = MockTransport::new();
        transport.route("values/R1C1", 200, &cell_entry("R1C1", 1, 1, "x"));
        transport.route("values/R2C2", 200, &cell_entry("R2C2", 2, 2, "y"));
        let worksheet = worksheet(transport.clone());

        let template = json!({ "a": "R1C1", "b": ["R2C2", "R1C1"] });
        let resolved = worksheet.map_cells(&template).await.expect("map_cells");
        assert_eq!(resolved, json!({ "a": "x", "b": ["y", "x"] }));

        // R1C1 occurs twice but is fetched exactly once.
        assert_eq!(transport.request_count(), 2);
        let urls: Vec<_> = transport.requests().into_iter().map(|(url, _)| url).collect();
        assert_eq!(urls.iter().filter(|u| u.contains("R1C1")).count(), 1);
    }

    #[tokio::test]
    async fn map_cells_with_a_modifier() {
        let transport = MockTransport::new();
        transport.route("values/R1C1", 200, &cell_entry("R1C1", 1, 1, "x"));
        let worksheet = worksheet(transport);

        let template = json!(["R1C1"]);
        let resolved = worksheet
            .map_cells_with(&template, |cell| json!(cell.token()))
            .await
            .expect("map_cells_with");
        assert_eq!(resolved, json!(["R1C1"]));

        let resolved = worksheet
            .map_cells_with(&json!(["R1C1"]), |cell| {
                json!(format!("cell({},{})", cell.row, cell.col))
            })
            .await
            .expect("map_cells_with");
        assert_eq!(resolved, json!(["cell(1,1)"]));
    }

    #[tokio::test]
    async fn map_cells_without_tokens_completes_with_an_unchanged_copy() {
        let transport = MockTransport::new();
        let worksheet = worksheet(transport.clone());

        let template = json!({ "a": 1, "b": ["plain", null, true] });
        let resolved = worksheet.map_cells(&template).await.expect("map_cells");
        assert_eq!(resolved, template);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn map_cells_fails_whole_operation_on_first_error() {
        let transport = MockTransport::new();
        transport.route("values/R1C1", 200, &cell_entry("R1C1", 1, 1, "x"));
        transport.route("values/R2C2", 500, "server error");
        let worksheet = worksheet(transport);

        let template = json!(["R1C1", "R2C2"]);
        let err = worksheet.map_cells(&template).await.unwrap_err();
        assert!(matches!(err, Error::RemoteFeed { status: 500, .. }));
    }

    #[tokio::test]
    async fn map_cells_null_cell_becomes_json_null() {
        let transport = MockTransport::new();
        transport.route(
            "values/R1C1",
            200,
            r#"<entry>
  <id>https://spreadsheets.google.com/feeds/cells/key123/od6/public/values/R1C1</id>
  <gs:cell row="1" col="1"></gs:cell>
</entry>"#,
        );
        let worksheet = worksheet(transport);

        let resolved = worksheet.map_cells(&json!({ "v": "R1C1" })).await.expect("map_cells");
        assert_eq!(resolved, json!({ "v": null }));
    }
}
