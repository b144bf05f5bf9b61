//! Barrage Loader Library
//!
//! This library turns comment documents into events and builds sorted
//! [`EventStore`]s from them. Exported XML comment files and their JSON
//! conversions are both accepted.

pub mod attributes;
pub mod document;
pub mod xml;

pub use attributes::{parse_attributes, Attributes};
pub use document::parse_document;
pub use xml::parse_xml_document;

use barrage_core::{Event, EventStore};
use std::path::Path;
use tracing::info;

/// Result type for barrage-loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for barrage-loader operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Barrage core error: {0}")]
    Core(#[from] barrage_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Document is not a list of comments")]
    NotAList,

    #[error("Comment {index}: invalid attributes: {reason}")]
    Attribute { index: usize, reason: String },

    #[error("Comment {index}: {reason}")]
    Entry { index: usize, reason: String },
}

impl From<Error> for barrage_core::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Core(inner) => inner,
            other => barrage_core::Error::InvalidInput(other.to_string()),
        }
    }
}

/// Comment document encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Xml,
}

impl DocumentFormat {
    /// Picks the format from a file extension; anything but `.xml` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => DocumentFormat::Xml,
            _ => DocumentFormat::Json,
        }
    }

    /// Parses a document in this format into events, in source order
    pub fn parse(self, input: &str) -> Result<Vec<Event>> {
        match self {
            DocumentFormat::Json => parse_document(input),
            DocumentFormat::Xml => parse_xml_document(input),
        }
    }
}

/// Parses a JSON comment document and builds a sorted store from it
pub fn load_store(input: &str) -> Result<EventStore> {
    load_store_as(input, DocumentFormat::Json)
}

/// Parses a comment document in the given format and builds a sorted store from it
pub fn load_store_as(input: &str, format: DocumentFormat) -> Result<EventStore> {
    let events = format.parse(input)?;
    Ok(EventStore::build(events)?)
}

/// Reads a comment file from disk and builds a sorted store from it.
///
/// `.xml` files are read as exported XML; everything else as JSON.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<EventStore> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path);
    let input = std::fs::read_to_string(path)?;
    let store = load_store_as(&input, format)?;
    info!(path = %path.display(), ?format, events = store.len(), "Comment file loaded");
    Ok(store)
}
