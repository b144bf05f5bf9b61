//! XML comment files, as exported by video sites
//!
//! ```xml
//! <i>
//!   <chatid>1</chatid>
//!   <d p="12.5,1,25,16777215,1600000000,0,a1b2c3d4,1">hello</d>
//! </i>
//! ```
//!
//! Only `<d>` children of the `<i>` root are comments; other elements are
//! ignored.

use crate::document::attributed_event;
use crate::{Error, Result};
use barrage_core::Event;
use tracing::debug;

/// Parses an XML comment file into events, in source order
pub fn parse_xml_document(input: &str) -> Result<Vec<Event>> {
    let document = roxmltree::Document::parse(input)?;
    let root = document.root_element();
    if !root.has_tag_name("i") {
        return Err(Error::NotAList);
    }

    let mut events = Vec::new();
    for (index, node) in root.children().filter(|n| n.has_tag_name("d")).enumerate() {
        let p = node.attribute("p").ok_or_else(|| Error::Entry {
            index,
            reason: "missing p attribute".to_string(),
        })?;
        events.push(attributed_event(index, p, node.text().unwrap_or_default())?);
    }

    debug!(parsed = events.len(), "XML comment file parsed");
    Ok(events)
}
