//! Barrage Core Library
//!
//! This library provides the time-cursor event index and the overlay
//! instance lifecycle engine for Barrage comment overlays: a sorted
//! [`EventStore`], a seeking [`Cursor`] that dispatches each due event exactly
//! once, and an [`InstanceManager`] that animates a bounded set of live
//! glyphs until they leave the screen.

pub mod config;
pub mod cursor;
pub mod engine;
pub mod event;
pub mod instance;
pub mod store;

pub use config::{EngineConfig, SeekConfig, VerticalBand};
pub use cursor::{Cursor, Dispatch, SeekReport, SeekStrategy};
pub use engine::{ClockSignal, Engine, TickReport};
pub use event::{Color, CommentMeta, Event, EventKind};
pub use instance::{
    ApproxMeasure, Instance, InstanceId, InstanceManager, SpawnContext, TextMeasure, Viewport,
};
pub use store::EventStore;

/// Result type for barrage-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for barrage-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Index {index} out of range for store of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
