//! JSON comment documents

use crate::attributes::{parse_attributes, Attributes};
use crate::{Error, Result};
use barrage_core::{Color, Event, EventKind};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// One element of a comment list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    /// Shape produced by converting an XML `<d p="...">text</d>` node
    Converted {
        #[serde(rename = "@attributes")]
        attributes: RawAttributes,
        #[serde(rename = "#text", default)]
        text: String,
    },
    /// `{"p": "...", "text": "..."}`
    Attributed {
        p: String,
        #[serde(alias = "#text", default)]
        text: String,
    },
    /// `{"time": 1.5, "text": "...", "kind": "top"}`
    Explicit {
        time: f64,
        #[serde(default)]
        text: String,
        kind: Option<RawKind>,
        size: Option<f32>,
        color: Option<RawColor>,
    },
}

#[derive(Debug, Deserialize)]
struct RawAttributes {
    p: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawKind {
    Scroll,
    Top,
    Bottom,
}

impl From<RawKind> for EventKind {
    fn from(kind: RawKind) -> Self {
        match kind {
            RawKind::Scroll => EventKind::Scroll,
            RawKind::Top => EventKind::Top,
            RawKind::Bottom => EventKind::Bottom,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawColor {
    Decimal(u32),
    Hex(String),
}

/// Parses a comment document into events, in source order.
///
/// Accepts a top-level array or the `{"i": {"d": [...]}}` wrapper; `null`
/// elements are skipped.
pub fn parse_document(input: &str) -> Result<Vec<Event>> {
    let document: Value = serde_json::from_str(input)?;
    let entries = comment_list(document)?;

    let total = entries.len();
    let mut events = Vec::with_capacity(total);
    for (index, value) in entries.into_iter().enumerate() {
        if value.is_null() {
            continue;
        }
        let entry: RawEntry = serde_json::from_value(value).map_err(|_| Error::Entry {
            index,
            reason: "not a recognised comment shape".to_string(),
        })?;
        events.push(to_event(index, entry)?);
    }

    debug!(parsed = events.len(), skipped = total - events.len(), "Comment document parsed");
    Ok(events)
}

fn comment_list(document: Value) -> Result<Vec<Value>> {
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut root) => match root.remove("i") {
            Some(Value::Object(mut body)) => match body.remove("d") {
                Some(Value::Array(items)) => Ok(items),
                // XML conversion collapses a single child into an object
                Some(single @ Value::Object(_)) => Ok(vec![single]),
                None => Ok(Vec::new()),
                Some(_) => Err(Error::NotAList),
            },
            _ => Err(Error::NotAList),
        },
        _ => Err(Error::NotAList),
    }
}

fn to_event(index: usize, entry: RawEntry) -> Result<Event> {
    match entry {
        RawEntry::Converted {
            attributes: RawAttributes { p },
            text,
        }
        | RawEntry::Attributed { p, text } => attributed_event(index, &p, text),
        RawEntry::Explicit {
            time,
            text,
            kind,
            size,
            color,
        } => {
            let mut event = Event::new(time, text);
            if let Some(kind) = kind {
                event = event.with_kind(kind.into());
            }
            if let Some(size) = size {
                event = event.with_font_size(size);
            }
            match color {
                Some(RawColor::Decimal(value)) => {
                    event = event.with_color(Color::from_decimal(value))
                }
                Some(RawColor::Hex(hex)) => {
                    let color = Color::from_hex(&hex).ok_or_else(|| Error::Entry {
                        index,
                        reason: format!("color '{}' is not #rrggbb", hex),
                    })?;
                    event = event.with_color(color);
                }
                None => {}
            }
            Ok(event)
        }
    }
}

/// Builds an event from a `p` attribute string and its text
pub(crate) fn attributed_event(
    index: usize,
    p: &str,
    text: impl Into<Arc<str>>,
) -> Result<Event> {
    let Attributes {
        time,
        kind,
        font_size,
        color,
        meta,
    } = parse_attributes(p).map_err(|reason| Error::Attribute { index, reason })?;

    let mut event = Event::new(time, text)
        .with_kind(kind)
        .with_font_size(font_size)
        .with_color(color);
    event.meta = meta;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributed_array() {
        let events = parse_document(
            r##"[
                {"p": "5.5,1,25,16777215,1600000000,0,abcd,1", "text": "hello"},
                null,
                {"p": "1.0,5,18,255", "#text": "top"}
            ]"##,
        )
        .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].due_time, 5.5);
        assert_eq!(&*events[0].text, "hello");
        assert!(events[0].meta.is_some());
        assert_eq!(events[1].kind, EventKind::Top);
        assert_eq!(events[1].color, Color::new(0, 0, 255));
        assert!(events[1].meta.is_none());
    }

    #[test]
    fn test_converted_xml_wrapper() {
        let events = parse_document(
            r##"{"i": {"d": [
                {"@attributes": {"p": "2,4,25,16777215"}, "#text": "bottom"},
                {"@attributes": {"p": "3"}}
            ]}}"##,
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Bottom);
        assert_eq!(&*events[1].text, "");

        // a lone comment is collapsed into an object
        let single =
            parse_document(r##"{"i": {"d": {"@attributes": {"p": "7"}, "#text": "x"}}}"##).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].due_time, 7.0);

        assert!(parse_document(r#"{"i": {}}"#).unwrap().is_empty());
    }

    #[test]
    fn test_explicit_entries() {
        let events = parse_document(
            r##"[
                {"time": 1.5, "text": "a", "kind": "bottom", "size": 30, "color": "#00ff00"},
                {"time": 2, "text": "b", "color": 16711680}
            ]"##,
        )
        .unwrap();
        assert_eq!(events[0].kind, EventKind::Bottom);
        assert_eq!(events[0].font_size, 30.0);
        assert_eq!(events[0].color, Color::new(0, 255, 0));
        assert_eq!(events[1].kind, EventKind::Scroll);
        assert_eq!(events[1].color, Color::new(255, 0, 0));
    }

    #[test]
    fn test_rejects_non_list_documents() {
        assert!(matches!(parse_document(r#"{"comments": []}"#), Err(Error::NotAList)));
        assert!(matches!(parse_document("42"), Err(Error::NotAList)));
        assert!(matches!(parse_document(r#"{"i": {"d": 3}}"#), Err(Error::NotAList)));
        assert!(matches!(parse_document("[1, 2"), Err(Error::Json(_))));
    }

    #[test]
    fn test_reports_failing_element() {
        match parse_document(r#"[{"p": "1"}, {"p": "oops"}]"#) {
            Err(Error::Attribute { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected attribute error, got {:?}", other),
        }
        match parse_document(r#"[{"time": 1, "kind": "sideways"}]"#) {
            Err(Error::Entry { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected entry error, got {:?}", other),
        }
        match parse_document(r#"[{"time": 1, "color": "blue"}]"#) {
            Err(Error::Entry { reason, .. }) => assert!(reason.contains("blue")),
            other => panic!("expected colour error, got {:?}", other),
        }
    }
}
