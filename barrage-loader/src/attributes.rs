//! Parsing of comma-separated comment attribute strings
//!
//! Exported comment files describe each comment with a `p` attribute of the
//! form `time,mode,size,color,sent_at,pool,sender_hash,row_id`. Only the
//! time is required; the remaining fields fall back to defaults when absent
//! or empty.

use barrage_core::event::DEFAULT_FONT_SIZE;
use barrage_core::{Color, CommentMeta, EventKind};
use std::str::FromStr;

/// Number of leading fields that only affect rendering; anything past them is provenance
const RENDER_FIELDS: usize = 4;

/// Decoded attribute string
#[derive(Debug, Clone, PartialEq)]
pub struct Attributes {
    pub time: f64,
    pub kind: EventKind,
    pub font_size: f32,
    pub color: Color,
    pub meta: Option<CommentMeta>,
}

/// Maps a numeric comment mode to a placement.
///
/// 4 is bottom and 5 is top; ordinary (1-3), reverse (6) and the special
/// modes are all drawn as scrolling text.
pub fn kind_from_mode(mode: u8) -> EventKind {
    match mode {
        4 => EventKind::Bottom,
        5 => EventKind::Top,
        _ => EventKind::Scroll,
    }
}

/// Parses an attribute string, returning a human-readable reason on failure
pub fn parse_attributes(raw: &str) -> Result<Attributes, String> {
    let fields: Vec<&str> = raw.split(',').map(str::trim).collect();

    let time_field = fields.first().copied().unwrap_or_default();
    if time_field.is_empty() {
        return Err("missing time".to_string());
    }
    let time: f64 = time_field
        .parse()
        .map_err(|_| format!("time '{}' is not a number", time_field))?;
    if !time.is_finite() {
        return Err(format!("time '{}' is not finite", time_field));
    }

    let mode: u8 = field(&fields, 1, "mode", 1)?;
    let font_size: f32 = field(&fields, 2, "size", DEFAULT_FONT_SIZE)?;
    let color: u32 = field(&fields, 3, "color", Color::WHITE.to_decimal())?;

    let meta = if fields.len() > RENDER_FIELDS {
        Some(CommentMeta {
            sent_at: field(&fields, 4, "timestamp", 0)?,
            pool: field(&fields, 5, "pool", 0)?,
            sender_hash: fields.get(6).map(|s| s.to_string()).unwrap_or_default(),
            row_id: field(&fields, 7, "row id", 0)?,
        })
    } else {
        None
    };

    Ok(Attributes {
        time,
        kind: kind_from_mode(mode),
        font_size,
        color: Color::from_decimal(color),
        meta,
    })
}

fn field<T: FromStr>(fields: &[&str], index: usize, name: &str, default: T) -> Result<T, String> {
    match fields.get(index) {
        None => Ok(default),
        Some(value) if value.is_empty() => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| format!("{} '{}' is not a valid number", name, value)),
    }
}
