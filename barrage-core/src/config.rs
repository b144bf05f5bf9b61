//! Engine configuration

use crate::{Error, Result};

/// Vertical band, as fractions of the viewport height, in which comment baselines are placed
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerticalBand {
    pub min: f32,
    pub max: f32,
}

impl VerticalBand {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

impl Default for VerticalBand {
    fn default() -> Self {
        Self::new(0.0, 0.8)
    }
}

/// Engine configuration
///
/// Every recognised option is listed here with its default. The engine
/// validates the whole struct once at construction and again on every
/// runtime update.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Maximum number of concurrently live instances
    pub capacity: usize,
    /// Base horizontal speed of scrolling comments, in pixels per frame
    pub base_speed: f32,
    /// Band in which baselines are sampled
    pub vertical_band: VerticalBand,
    /// Opacity, 0-100
    pub opacity: u8,
    /// Forward steps shorter than this (seconds) are treated as continuous playback
    pub debounce_seconds: f64,
    /// Jumps longer than this (seconds) re-sync by binary search instead of a local scan
    pub far_jump_threshold_seconds: f64,
    /// Multiplier applied to each comment's font size
    pub font_scale: f32,
    /// Frames a top/bottom comment stays visible
    pub static_frames: u32,
    /// Whether live instances are handed to the renderer
    pub visible: bool,
    /// Seed for vertical placement; entropy when unset
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            base_speed: 2.0,
            vertical_band: VerticalBand::default(),
            opacity: 100,
            debounce_seconds: 0.5,
            far_jump_threshold_seconds: 10.0,
            font_scale: 1.0,
            static_frames: 240,
            visible: true,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Checks every option against its allowed range
    pub fn validate(&self) -> Result<()> {
        let band = self.vertical_band;
        let unit = 0.0..=1.0;
        if !unit.contains(&band.min) || !unit.contains(&band.max) || band.min > band.max {
            return Err(Error::InvalidConfig(format!(
                "vertical band [{}, {}] must satisfy 0 <= min <= max <= 1",
                band.min, band.max
            )));
        }
        if self.opacity > 100 {
            return Err(Error::InvalidConfig(format!(
                "opacity {} exceeds 100",
                self.opacity
            )));
        }
        if !self.base_speed.is_finite() || self.base_speed <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "base speed {} must be finite and positive",
                self.base_speed
            )));
        }
        if !self.font_scale.is_finite() || self.font_scale <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "font scale {} must be finite and positive",
                self.font_scale
            )));
        }
        self.seek().validate()
    }

    /// The subset of options the cursor needs
    pub fn seek(&self) -> SeekConfig {
        SeekConfig {
            debounce_seconds: self.debounce_seconds,
            far_jump_threshold_seconds: self.far_jump_threshold_seconds,
        }
    }

    /// Opacity as a 0.0-1.0 alpha factor
    pub fn alpha(&self) -> f32 {
        f32::from(self.opacity.min(100)) / 100.0
    }
}

/// Seek thresholds used by [`crate::Cursor::advance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekConfig {
    pub debounce_seconds: f64,
    pub far_jump_threshold_seconds: f64,
}

impl SeekConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.debounce_seconds.is_finite() || self.debounce_seconds < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "debounce window {}s must be finite and non-negative",
                self.debounce_seconds
            )));
        }
        if !self.far_jump_threshold_seconds.is_finite() || self.far_jump_threshold_seconds <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "far jump threshold {}s must be finite and positive",
                self.far_jump_threshold_seconds
            )));
        }
        Ok(())
    }
}

impl Default for SeekConfig {
    fn default() -> Self {
        EngineConfig::default().seek()
    }
}
