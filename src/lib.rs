//! Sheetfeed - an async client for the Google Spreadsheets Data API feeds
//!
//! This library fetches the `worksheets`, `list`, and `cells` Atom feeds of a
//! published spreadsheet, parses them into structured entities, and exposes
//! iteration and lookup operations over them.
//!
//! # Features
//!
//! - **Worksheet discovery**: enumerate worksheets or look one up by index or id
//! - **Row and cell feeds**: iterate rows/cells or fetch a single entry by id
//! - **Placeholder substitution**: resolve `R<row>C<col>` tokens embedded in an
//!   arbitrary nested JSON structure, fetching each distinct cell once
//! - **Credential refresh**: bounded retry with forced token refresh on 401
//! - **Pluggable transport and credentials**: traits for the HTTP layer and the
//!   auth-header provider, with a `reqwest`-backed default transport
//!
//! # Example - Listing worksheets
//!
//! ```no_run
//! use sheetfeed::Spreadsheet;
//!
//! # async fn run() -> sheetfeed::Result<()> {
//! let mut spreadsheet = Spreadsheet::new("0AsbDOxAk3V-RdFo3WHo1WWpVcUl3Rk5V")?;
//! for worksheet in spreadsheet.worksheets().await? {
//!     println!("{}: {}", worksheet.index(), worksheet.title().unwrap_or("untitled"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Reading rows
//!
//! ```no_run
//! use sheetfeed::Spreadsheet;
//!
//! # async fn run() -> sheetfeed::Result<()> {
//! let mut spreadsheet = Spreadsheet::new("0AsbDOxAk3V-RdFo3WHo1WWpVcUl3Rk5V")?;
//! let worksheet = spreadsheet.worksheet(1).await?;
//! for (row, meta) in worksheet.rows().await? {
//!     println!("{}: {:?}", meta.id, row.get("name"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Placeholder substitution
//!
//! ```no_run
//! use serde_json::json;
//! use sheetfeed::Spreadsheet;
//!
//! # async fn run() -> sheetfeed::Result<()> {
//! let mut spreadsheet = Spreadsheet::new("0AsbDOxAk3V-RdFo3WHo1WWpVcUl3Rk5V")?;
//! let worksheet = spreadsheet.worksheet(1).await?;
//! let template = json!({ "heading": "R1C1", "totals": ["R2C2", "R1C1"] });
//! let resolved = worksheet.map_cells(&template).await?;
//! println!("{resolved}");
//! # Ok(())
//! # }
//! ```

/// Shared types and utilities.
pub mod common;

/// Feed transport, URL construction, and document parsing.
pub mod feed;

/// Spreadsheet, worksheet, and entity operations over the feed protocol.
pub mod sheet;

// Re-export commonly used types for convenience
pub use common::{Error, Result};
pub use feed::{
    AuthProvider, FeedClient, FeedConfig, FeedKind, HttpTransport, NoAuth, Transport, Visibility,
    XmlValue,
};
pub use sheet::{Cell, Meta, Row, Spreadsheet, Worksheet, WorksheetSelector};
