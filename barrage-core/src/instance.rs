//! Live overlay instances: spawning, per-frame kinematics and expiry

use crate::{Color, EngineConfig, Event, EventKind};
use rand::Rng;
use std::sync::Arc;
use tracing::trace;

/// Size of the drawing surface in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Glyph metrics supplied by the renderer
pub trait TextMeasure {
    /// Rendered width in pixels of `text` at `font_size`
    fn width(&self, text: &str, font_size: f32) -> f32;
}

/// Font-independent estimate: half-width glyphs for ASCII, full-width otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMeasure;

impl TextMeasure for ApproxMeasure {
    fn width(&self, text: &str, font_size: f32) -> f32 {
        let ems: f32 = text
            .chars()
            .map(|c| if c.is_ascii() { 0.55 } else { 1.0 })
            .sum();
        ems * font_size
    }
}

/// Identifier assigned to each spawned instance, unique per manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

/// Everything an instance needs from its surroundings at spawn time
pub struct SpawnContext<'a> {
    pub viewport: Viewport,
    pub config: &'a EngineConfig,
    pub measure: &'a dyn TextMeasure,
    /// Frame counter of the tick performing the spawn
    pub frame: u64,
}

/// A comment currently on screen
#[derive(Debug, Clone)]
pub struct Instance {
    id: InstanceId,
    kind: EventKind,
    text: Arc<str>,
    color: Color,
    font_size: f32,
    opacity: f32,
    width: f32,
    /// Left edge of the glyph run
    x: f32,
    /// Text baseline
    y: f32,
    /// Pixels per frame, leftwards
    velocity: f32,
    born_at: u64,
    age: u32,
    lifetime: u32,
    expired: bool,
}

impl Instance {
    fn spawn(id: InstanceId, event: &Event, ctx: &SpawnContext<'_>, rng: &mut impl Rng) -> Self {
        let config = ctx.config;
        let viewport = ctx.viewport;
        let font_size = event.font_size * config.font_scale;
        let width = ctx.measure.width(&event.text, font_size);

        let (x, velocity) = if event.kind.is_static() {
            ((viewport.width - width) / 2.0, 0.0)
        } else {
            // longer text moves slightly faster so transit times stay comparable
            let velocity = config.base_speed + event.char_len() as f32 / 100.0;
            (viewport.width, velocity)
        };

        Self {
            id,
            kind: event.kind,
            text: Arc::clone(&event.text),
            color: event.color,
            font_size,
            opacity: config.alpha(),
            width,
            x,
            y: sample_baseline(viewport, config, font_size, rng),
            velocity,
            born_at: ctx.frame,
            age: 0,
            lifetime: config.static_frames,
            expired: false,
        }
    }

    /// Advances one frame
    fn advance(&mut self) {
        if self.expired {
            return;
        }
        self.age = self.age.saturating_add(1);
        if self.kind.is_static() {
            if self.age >= self.lifetime {
                self.expired = true;
            }
        } else {
            self.x -= self.velocity;
            if self.x < -self.width {
                self.expired = true;
            }
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Opacity as a 0.0-1.0 alpha factor
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    /// `(x, baseline)` in pixels
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Frame at which the instance was spawned
    pub fn born_at(&self) -> u64 {
        self.born_at
    }

    /// Frames advanced since spawn
    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

/// Uniform sample inside the vertical band, clamped so the whole glyph stays on screen
fn sample_baseline(
    viewport: Viewport,
    config: &EngineConfig,
    font_size: f32,
    rng: &mut impl Rng,
) -> f32 {
    let band = config.vertical_band;
    let height = viewport.height;
    let sampled = band.min * height + (band.max - band.min) * height * rng.random::<f32>();

    if sampled < font_size {
        font_size
    } else if sampled > height - font_size {
        (height - font_size).max(font_size)
    } else {
        sampled
    }
}

/// Owns the bounded set of live instances.
///
/// When the set is full new spawns are dropped and counted; live instances
/// are never displaced to make room.
#[derive(Debug, Clone)]
pub struct InstanceManager {
    live: Vec<Instance>,
    capacity: usize,
    next_id: u64,
    spawned: u64,
    dropped: u64,
}

impl InstanceManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            live: Vec::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 0,
            spawned: 0,
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the cap for future spawns; existing instances are kept
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Spawns an instance for `event`, or returns `None` and counts a drop when full
    pub fn spawn(
        &mut self,
        event: &Event,
        ctx: &SpawnContext<'_>,
        rng: &mut impl Rng,
    ) -> Option<InstanceId> {
        if self.live.len() >= self.capacity {
            self.dropped += 1;
            trace!(
                due = event.due_time,
                live = self.live.len(),
                "Instance dropped, at capacity"
            );
            return None;
        }

        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.spawned += 1;
        self.live.push(Instance::spawn(id, event, ctx, rng));
        Some(id)
    }

    /// Advances every live instance by one frame, flagging those that finished
    pub fn tick(&mut self) {
        for instance in &mut self.live {
            instance.advance();
        }
    }

    /// Removes expired instances and returns how many were removed
    pub fn sweep(&mut self) -> usize {
        let before = self.live.len();
        self.live.retain(|instance| !instance.expired);
        before - self.live.len()
    }

    /// Removes every live instance
    pub fn clear(&mut self) {
        self.live.clear();
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.live.iter().find(|instance| instance.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        self.live.iter()
    }

    pub fn as_slice(&self) -> &[Instance] {
        &self.live
    }

    /// Number of live instances
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Total instances spawned
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Total spawns refused because the set was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VerticalBand;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    struct FixedWidth(f32);

    impl TextMeasure for FixedWidth {
        fn width(&self, _text: &str, _font_size: f32) -> f32 {
            self.0
        }
    }

    fn context<'a>(config: &'a EngineConfig, measure: &'a dyn TextMeasure) -> SpawnContext<'a> {
        SpawnContext {
            viewport: Viewport::new(100.0, 200.0),
            config,
            measure,
            frame: 0,
        }
    }

    #[test]
    fn test_capacity_drops_excess_spawns() {
        let config = EngineConfig::default();
        let measure = ApproxMeasure;
        let ctx = context(&config, &measure);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut manager = InstanceManager::new(3);

        let ids: Vec<_> = (0..5)
            .map(|i| manager.spawn(&Event::new(i as f64, "hi"), &ctx, &mut rng))
            .collect();

        assert!(ids[..3].iter().all(Option::is_some));
        assert!(ids[3..].iter().all(Option::is_none));
        assert_eq!(manager.len(), 3);
        assert_eq!(manager.spawned(), 3);
        assert_eq!(manager.dropped(), 2);
        // the first three are still the live ones
        assert!(manager.get(InstanceId(0)).is_some());
        assert!(manager.get(InstanceId(2)).is_some());
    }

    #[test]
    fn test_lowering_capacity_keeps_existing_instances() {
        let config = EngineConfig::default();
        let measure = ApproxMeasure;
        let ctx = context(&config, &measure);
        let mut rng = SmallRng::seed_from_u64(2);
        let mut manager = InstanceManager::new(10);
        for i in 0..6 {
            manager.spawn(&Event::new(i as f64, "x"), &ctx, &mut rng);
        }

        manager.set_capacity(2);
        assert_eq!(manager.len(), 6);
        assert!(manager.spawn(&Event::new(9.0, "y"), &ctx, &mut rng).is_none());
        manager.tick();
        manager.sweep();
        assert_eq!(manager.len(), 6);
    }

    #[test]
    fn test_scroll_instance_expires_off_screen() {
        let config = EngineConfig::default();
        let measure = FixedWidth(10.0);
        let ctx = context(&config, &measure);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut manager = InstanceManager::new(10);
        let id = manager.spawn(&Event::new(0.0, ""), &ctx, &mut rng).unwrap();

        let instance = manager.get(id).unwrap();
        assert_eq!(instance.position().0, 100.0);
        assert_eq!(instance.velocity(), 2.0);

        // x goes 100 -> -10 after 55 frames, expiry needs x < -10
        for _ in 0..55 {
            manager.tick();
        }
        assert!(!manager.get(id).unwrap().is_expired());
        assert_eq!(manager.sweep(), 0);

        manager.tick();
        assert!(manager.get(id).unwrap().is_expired());
        assert_eq!(manager.sweep(), 1);
        assert_eq!(manager.sweep(), 0);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_longer_text_scrolls_faster() {
        let config = EngineConfig::default();
        let measure = ApproxMeasure;
        let ctx = context(&config, &measure);
        let mut rng = SmallRng::seed_from_u64(4);
        let mut manager = InstanceManager::new(10);

        let short = manager.spawn(&Event::new(0.0, "ok"), &ctx, &mut rng).unwrap();
        let long = manager
            .spawn(&Event::new(0.0, "a".repeat(50)), &ctx, &mut rng)
            .unwrap();

        let short_speed = manager.get(short).unwrap().velocity();
        let long_speed = manager.get(long).unwrap().velocity();
        assert!((short_speed - 2.02).abs() < 1e-6);
        assert!((long_speed - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_static_instance_holds_position_until_lifetime() {
        let config = EngineConfig {
            static_frames: 3,
            ..Default::default()
        };
        let measure = FixedWidth(40.0);
        let ctx = context(&config, &measure);
        let mut rng = SmallRng::seed_from_u64(5);
        let mut manager = InstanceManager::new(10);
        let id = manager
            .spawn(&Event::new(0.0, "top").with_kind(EventKind::Top), &ctx, &mut rng)
            .unwrap();

        let start = manager.get(id).unwrap().position();
        assert_eq!(start.0, 30.0);

        manager.tick();
        manager.tick();
        let instance = manager.get(id).unwrap();
        assert_eq!(instance.position(), start);
        assert_eq!(instance.age(), 2);
        assert!(!instance.is_expired());

        manager.tick();
        assert!(manager.get(id).unwrap().is_expired());
        assert_eq!(manager.sweep(), 1);
    }

    #[test]
    fn test_baseline_stays_inside_band_and_screen() {
        let config = EngineConfig {
            vertical_band: VerticalBand::new(0.25, 0.5),
            ..Default::default()
        };
        let measure = ApproxMeasure;
        let ctx = context(&config, &measure);
        let mut rng = SmallRng::seed_from_u64(6);
        let mut manager = InstanceManager::new(500);
        for i in 0..500 {
            manager.spawn(&Event::new(i as f64, "y"), &ctx, &mut rng);
        }
        assert!(manager.iter().all(|i| {
            let (_, y) = i.position();
            (50.0..=100.0).contains(&y)
        }));
    }

    #[test]
    fn test_baseline_clamped_to_glyph_height() {
        let measure = ApproxMeasure;
        let mut rng = SmallRng::seed_from_u64(7);

        // band hugging the top edge
        let top = EngineConfig {
            vertical_band: VerticalBand::new(0.0, 0.0),
            ..Default::default()
        };
        let y = sample_baseline(Viewport::new(100.0, 200.0), &top, 25.0, &mut rng);
        assert_eq!(y, 25.0);

        // band hugging the bottom edge
        let bottom = EngineConfig {
            vertical_band: VerticalBand::new(1.0, 1.0),
            ..Default::default()
        };
        let y = sample_baseline(Viewport::new(100.0, 200.0), &bottom, 25.0, &mut rng);
        assert_eq!(y, 175.0);

        // viewport shorter than two glyphs
        let y = sample_baseline(Viewport::new(100.0, 30.0), &bottom, 25.0, &mut rng);
        assert_eq!(y, 25.0);

        let scaled = EngineConfig {
            font_scale: 2.0,
            opacity: 40,
            ..Default::default()
        };
        let ctx = context(&scaled, &measure);
        let mut manager = InstanceManager::new(1);
        let id = manager
            .spawn(&Event::new(0.0, "abc").with_font_size(10.0), &ctx, &mut rng)
            .unwrap();
        let instance = manager.get(id).unwrap();
        assert_eq!(instance.font_size(), 20.0);
        assert!((instance.opacity() - 0.4).abs() < 1e-6);
        assert!((instance.width() - 33.0).abs() < 1e-4);
    }
}
