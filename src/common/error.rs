//! Unified error types for feed operations.
//!
//! Every expected failure mode of the fetch-parse pipeline maps to one
//! variant here, so callers receive a single error value per call.
use std::time::Duration;
use thiserror::Error;

/// Main error type for feed operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid client-side configuration, e.g. an empty
    /// spreadsheet key or worksheet id
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying transport failure, propagated unchanged
    #[error("Transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),

    /// The feed kept responding 401 after the configured number of
    /// forced credential refreshes
    #[error("Authentication failed after {attempts} refresh attempts")]
    Auth { attempts: u32 },

    /// Non-success response from the feed server, carrying the raw body
    #[error("Feed request failed with status {status}: {body}")]
    RemoteFeed { status: u16, body: String },

    /// XML parsing failure
    #[error("Parse error: {0}")]
    Parse(String),

    /// Requested worksheet, row, or cell does not exist in the fetched feed
    #[error("Not found: {0}")]
    NotFound(String),

    /// The feed returned zero entries where at least one was expected
    #[error("Feed returned no entries")]
    EmptyFeed,

    /// A fetch exceeded the configured deadline
    #[error("Feed request timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
