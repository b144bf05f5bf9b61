//! Comment event data structures

use std::fmt;
use std::sync::Arc;

/// Default glyph height in pixels for comments that carry no size
pub const DEFAULT_FONT_SIZE: f32 = 25.0;

/// How a comment is placed on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EventKind {
    /// Scrolls right to left across the viewport
    #[default]
    Scroll,
    /// Pinned, horizontally centered, near the top
    Top,
    /// Pinned, horizontally centered, near the bottom
    Bottom,
}

impl EventKind {
    /// Static comments do not translate horizontally
    pub fn is_static(self) -> bool {
        matches!(self, EventKind::Top | EventKind::Bottom)
    }
}

/// 24-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a colour from a packed decimal `0xRRGGBB` value; higher bits are ignored
    pub fn from_decimal(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        }
    }

    /// Parses `#rrggbb` or `rrggbb`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self::from_decimal)
    }

    pub fn to_decimal(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Provenance metadata carried by comments exported from a video site
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommentMeta {
    /// Unix timestamp (seconds) at which the comment was posted
    pub sent_at: i64,
    /// Comment pool the comment belongs to
    pub pool: u8,
    /// Hash of the sender's user id
    pub sender_hash: String,
    /// Row id, orders comments and marks history
    pub row_id: u64,
}

/// A single time-stamped comment.
///
/// Events are built once at load time and never mutated afterwards; the
/// text is reference counted so live instances can share it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Time in seconds, relative to the start of the video, at which the comment is due
    pub due_time: f64,
    /// Placement mode
    pub kind: EventKind,
    /// Comment text
    pub text: Arc<str>,
    /// Glyph height in pixels before scaling
    pub font_size: f32,
    /// Fill colour
    pub color: Color,
    /// Optional provenance metadata
    pub meta: Option<CommentMeta>,
}

impl Event {
    /// Creates a white scrolling comment with the default font size
    pub fn new(due_time: f64, text: impl Into<Arc<str>>) -> Self {
        Self {
            due_time,
            kind: EventKind::Scroll,
            text: text.into(),
            font_size: DEFAULT_FONT_SIZE,
            color: Color::WHITE,
            meta: None,
        }
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_meta(mut self, meta: CommentMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Number of characters in the comment text
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
