//! Feed transport, URL construction, and document parsing.
//!
//! The feed protocol is plain HTTP GET against Atom feed URLs. This module
//! owns everything below the entity layer: building feed URLs, performing
//! authenticated fetches with the 401 refresh-and-retry path, and parsing
//! response bodies into the generic [`XmlValue`] document shape.

// Submodule declarations
pub mod client;
pub mod document;
pub mod envelope;
pub mod url;

// Re-exports
pub use client::{AuthProvider, FeedClient, FeedConfig, HttpTransport, NoAuth, Response, Transport};
pub use document::XmlValue;
pub use envelope::FeedEnvelope;
pub use url::{FeedKind, Visibility};
