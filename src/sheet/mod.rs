//! Spreadsheet, worksheet, and entity operations over the feed protocol.
//!
//! A [`Spreadsheet`] discovers its [`Worksheet`]s through the worksheet
//! feed; each worksheet loads [`Row`]s or [`Cell`]s (paired with per-entry
//! [`Meta`]) from its row and cell feeds. Every operation re-fetches from
//! the network; nothing is cached across calls.

// Submodule declarations
pub mod entities;
pub mod spreadsheet;
pub mod template;
pub mod worksheet;

// Re-exports
pub use entities::{Cell, Meta, Row};
pub use spreadsheet::{Spreadsheet, WorksheetSelector};
pub use worksheet::Worksheet;
