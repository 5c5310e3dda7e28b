//! Feed URL construction.
//!
//! URLs follow the fixed shape
//! `{base}/{kind}/{key}[/{worksheet_id}]/{visibility}/values[/{entry_id}]?hl={locale}`.

/// Protocol host and root path shared by every feed URL.
pub const FEED_BASE: &str = "https://spreadsheets.google.com/feeds";

/// The three feed collections exposed per spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// The worksheet catalogue of a spreadsheet
    Worksheets,
    /// Row-oriented entries of one worksheet
    List,
    /// Cell-oriented entries of one worksheet
    Cells,
}

impl FeedKind {
    /// The URL path segment for this feed kind.
    pub fn segment(self) -> &'static str {
        match self {
            FeedKind::Worksheets => "worksheets",
            FeedKind::List => "list",
            FeedKind::Cells => "cells",
        }
    }
}

/// Whether a feed is fetched under the `public` or `private` path segment.
///
/// Private visibility is selected whenever a credential provider is
/// configured on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    /// The URL path segment for this visibility mode.
    pub fn segment(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

/// Build a complete feed URL from its fixed path segments.
///
/// `worksheet_id` is required for row and cell feeds and absent for the
/// worksheet catalogue; `entry_id` scopes the fetch to a single entry.
pub fn feed_url(
    kind: FeedKind,
    key: &str,
    worksheet_id: Option<&str>,
    visibility: Visibility,
    entry_id: Option<&str>,
    locale: &str,
) -> String {
    let mut url = String::with_capacity(FEED_BASE.len() + key.len() + 64);
    url.push_str(FEED_BASE);
    url.push('/');
    url.push_str(kind.segment());
    url.push('/');
    url.push_str(key);
    if let Some(id) = worksheet_id {
        url.push('/');
        url.push_str(id);
    }
    url.push('/');
    url.push_str(visibility.segment());
    url.push_str("/values");
    if let Some(id) = entry_id {
        url.push('/');
        url.push_str(id);
    }
    url.push_str("?hl=");
    url.push_str(locale);
    url
}
