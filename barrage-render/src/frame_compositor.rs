//! Frame compositor for overlay instances

use crate::{Error, Result};
use barrage_core::{Instance, Viewport};
use image::{ImageBuffer, Rgba, RgbaImage};
use std::path::Path;

/// Draws live instances onto a transparent frame the size of the viewport.
///
/// Glyph rasterisation belongs to the host renderer; the compositor draws
/// each instance as a filled box covering its glyph run, with a one pixel
/// shadow under the baseline.
#[derive(Debug, Clone, Copy)]
pub struct FrameCompositor {
    width: u32,
    height: u32,
}

impl FrameCompositor {
    /// Creates a compositor for a `width` x `height` frame
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidViewport {
                width: width as f32,
                height: height as f32,
            });
        }
        Ok(Self { width, height })
    }

    /// Creates a compositor matching an engine viewport
    pub fn for_viewport(viewport: Viewport) -> Result<Self> {
        let invalid = Error::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        };
        if !viewport.width.is_finite() || !viewport.height.is_finite() {
            return Err(invalid);
        }
        let width = viewport.width.round();
        let height = viewport.height.round();
        if width < 1.0 || height < 1.0 || width > u32::MAX as f32 || height > u32::MAX as f32 {
            return Err(invalid);
        }
        Self::new(width as u32, height as u32)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Renders one frame containing the given instances, in order
    pub fn render_frame<'a, I>(&self, instances: I) -> RgbaImage
    where
        I: IntoIterator<Item = &'a Instance>,
    {
        let mut frame = ImageBuffer::from_pixel(self.width, self.height, Rgba([0, 0, 0, 0]));

        for instance in instances {
            overlay_instance(&mut frame, instance);
        }

        frame
    }

    /// Renders a frame and writes it to `path`; the format follows the extension
    pub fn save_frame<'a, I, P>(&self, instances: I, path: P) -> Result<()>
    where
        I: IntoIterator<Item = &'a Instance>,
        P: AsRef<Path>,
    {
        self.render_frame(instances).save(path)?;
        Ok(())
    }
}

/// Draws the glyph box of one instance, clipped to the frame
fn overlay_instance(frame: &mut RgbaImage, instance: &Instance) {
    let (x, baseline) = instance.position();
    let alpha = instance.opacity().clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }

    let left = x.floor() as i64;
    let right = (x + instance.width()).ceil() as i64;
    let top = (baseline - instance.font_size()).floor() as i64;
    let bottom = baseline.floor() as i64;

    // shadow first so the box covers its overlap
    fill_rect(
        frame,
        left + 1,
        bottom,
        right + 1,
        bottom + 1,
        [0, 0, 0],
        alpha,
    );

    let color = instance.color();
    let rgb = [color.r, color.g, color.b];
    fill_rect(frame, left, top, right, bottom, rgb, alpha);
}

/// Blends a solid rectangle `[x0, x1) x [y0, y1)` over the frame
fn fill_rect(
    frame: &mut RgbaImage,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    rgb: [u8; 3],
    alpha: f32,
) {
    let width = i64::from(frame.width());
    let height = i64::from(frame.height());

    let x_start = x0.max(0);
    let y_start = y0.max(0);
    let x_end = x1.min(width);
    let y_end = y1.min(height);

    if x_start >= x_end || y_start >= y_end {
        return; // Nothing visible
    }

    for y in y_start..y_end {
        for x in x_start..x_end {
            let pixel = frame.get_pixel_mut(x as u32, y as u32);
            *pixel = blend_over(*pixel, rgb, alpha);
        }
    }
}

/// Porter-Duff "over" of a flat colour onto a possibly transparent pixel
fn blend_over(base: Rgba<u8>, rgb: [u8; 3], alpha: f32) -> Rgba<u8> {
    let base_alpha = base[3] as f32 / 255.0;
    let out_alpha = alpha + base_alpha * (1.0 - alpha);
    if out_alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| {
        let covered = base[i] as f32 * base_alpha * (1.0 - alpha);
        let value = (rgb[i] as f32 * alpha + covered) / out_alpha;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_alpha * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use barrage_core::{
        ClockSignal, Color, Engine, EngineConfig, Event, EventKind, EventStore, VerticalBand,
    };
    use std::sync::Arc;

    /// Engine with one centred top comment "abcd" at 20px: box x 78..122, y 30..50
    fn engine_with_top_comment(opacity: u8) -> Engine {
        let store = EventStore::build(vec![Event::new(0.0, "abcd")
            .with_kind(EventKind::Top)
            .with_font_size(20.0)
            .with_color(Color::new(255, 0, 0))])
        .unwrap();
        let config = EngineConfig {
            vertical_band: VerticalBand::new(0.5, 0.5),
            opacity,
            seed: Some(1),
            ..Default::default()
        };
        let mut engine = Engine::new(Arc::new(store), config, Viewport::new(200.0, 100.0)).unwrap();
        engine.tick(ClockSignal::playing(0.0));
        engine
    }

    #[test]
    fn test_empty_frame_is_transparent() {
        let compositor = FrameCompositor::new(16, 8).unwrap();
        let frame = compositor.render_frame(std::iter::empty());
        assert_eq!(frame.dimensions(), (16, 8));
        assert!(frame.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_instance_box_and_shadow() {
        let engine = engine_with_top_comment(100);
        let compositor = FrameCompositor::for_viewport(engine.viewport()).unwrap();
        let frame = compositor.render_frame(engine.instances());

        assert_eq!(*frame.get_pixel(100, 40), Rgba([255, 0, 0, 255]));
        assert_eq!(*frame.get_pixel(78, 30), Rgba([255, 0, 0, 255]));
        assert_eq!(*frame.get_pixel(100, 50), Rgba([0, 0, 0, 255]));
        assert_eq!(frame.get_pixel(100, 51)[3], 0);
        assert_eq!(frame.get_pixel(10, 10)[3], 0);
        assert_eq!(frame.get_pixel(123, 40)[3], 0);
    }

    #[test]
    fn test_opacity_blends_alpha() {
        let engine = engine_with_top_comment(50);
        let compositor = FrameCompositor::for_viewport(engine.viewport()).unwrap();
        let frame = compositor.render_frame(engine.instances());

        let pixel = frame.get_pixel(100, 40);
        assert_eq!(pixel[0], 255);
        assert!((126..=129).contains(&pixel[3]));
    }

    #[test]
    fn test_offscreen_instances_are_clipped() {
        // scrolling comments spawn just past the right edge
        let store = EventStore::build(vec![Event::new(0.0, "off screen")]).unwrap();
        let config = EngineConfig {
            seed: Some(2),
            ..Default::default()
        };
        let mut engine = Engine::new(Arc::new(store), config, Viewport::new(64.0, 64.0)).unwrap();
        engine.tick(ClockSignal::playing(0.0));

        let compositor = FrameCompositor::for_viewport(engine.viewport()).unwrap();
        let frame = compositor.render_frame(engine.instances());
        assert!(frame.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_blend_over_opaque_base() {
        let blended = blend_over(Rgba([0, 0, 255, 255]), [255, 0, 0], 0.5);
        assert_eq!(blended[3], 255);
        assert!((127..=128).contains(&blended[0]));
        assert!((127..=128).contains(&blended[2]));
    }

    #[test]
    fn test_invalid_viewports() {
        assert!(FrameCompositor::new(0, 10).is_err());
        assert!(FrameCompositor::for_viewport(Viewport::new(f32::NAN, 10.0)).is_err());
        assert!(FrameCompositor::for_viewport(Viewport::new(0.2, 10.0)).is_err());
    }
}
