//! Barrage Render Library
//!
//! This library draws preview frames of live overlay instances into RGBA
//! images.

pub mod frame_compositor;

pub use frame_compositor::FrameCompositor;

/// Result type for barrage-render operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for barrage-render operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid viewport: {width}x{height}")]
    InvalidViewport { width: f32, height: f32 },
}
