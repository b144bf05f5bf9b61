//! Tick-driven engine tying the cursor to the instance pool

use crate::{
    ApproxMeasure, Cursor, EngineConfig, EventStore, Instance, InstanceManager, Result,
    SeekReport, SeekStrategy, SpawnContext, TextMeasure, Viewport,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info};

/// Clock sample delivered by the host once per rendered frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSignal {
    /// Playback position in seconds
    pub time: f64,
    pub paused: bool,
    /// Set on the first tick after a user-initiated seek
    pub jumped: bool,
}

impl ClockSignal {
    pub fn playing(time: f64) -> Self {
        Self {
            time,
            paused: false,
            jumped: false,
        }
    }

    pub fn paused(time: f64) -> Self {
        Self {
            time,
            paused: true,
            jumped: false,
        }
    }

    pub fn jumped(self) -> Self {
        Self {
            jumped: true,
            ..self
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Cursor re-sync, `None` when the tick left the cursor alone
    pub seek: Option<SeekReport>,
    /// Events that became due this tick
    pub dispatched: usize,
    pub spawned: usize,
    /// Due events refused because the instance pool was full
    pub dropped: usize,
    /// Instances swept after finishing
    pub expired: usize,
    /// Live instances after the tick
    pub live: usize,
}

/// Comment overlay engine.
///
/// Owns the cursor, the live instance pool and the configuration; the event
/// store is shared read-only. The host calls [`Engine::tick`] once per
/// frame and draws [`Engine::instances`].
pub struct Engine {
    store: Arc<EventStore>,
    cursor: Cursor,
    instances: InstanceManager,
    config: EngineConfig,
    viewport: Viewport,
    measure: Box<dyn TextMeasure>,
    rng: SmallRng,
    frame: u64,
}

impl Engine {
    /// Creates an engine using [`ApproxMeasure`] for glyph widths
    pub fn new(store: Arc<EventStore>, config: EngineConfig, viewport: Viewport) -> Result<Self> {
        Self::with_measure(store, config, viewport, Box::new(ApproxMeasure))
    }

    pub fn with_measure(
        store: Arc<EventStore>,
        config: EngineConfig,
        viewport: Viewport,
        measure: Box<dyn TextMeasure>,
    ) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        Ok(Self {
            store,
            cursor: Cursor::new(),
            instances: InstanceManager::new(config.capacity),
            config,
            viewport,
            measure,
            rng,
            frame: 0,
        })
    }

    /// Processes one clock sample.
    ///
    /// While playing, live instances advance one frame and finished ones are
    /// swept, then the cursor re-syncs and every newly due event is spawned.
    /// While paused, instances are frozen. A paused tick flagged `jumped`, or
    /// one that moves backward, re-syncs the cursor without dispatching; a
    /// plain forward sample is left for the next playing tick to deliver.
    pub fn tick(&mut self, signal: ClockSignal) -> TickReport {
        let seek_config = self.config.seek();

        if signal.paused {
            let rewound = signal.time < self.cursor.last_time();
            let seek = (signal.jumped || rewound).then(|| {
                self.cursor
                    .advance(&self.store, signal.time, signal.jumped, &seek_config)
            });
            return TickReport {
                seek,
                dispatched: 0,
                spawned: 0,
                dropped: 0,
                expired: 0,
                live: self.instances.len(),
            };
        }

        self.frame += 1;
        self.instances.tick();
        let expired = self.instances.sweep();

        let seek = self
            .cursor
            .advance(&self.store, signal.time, signal.jumped, &seek_config);

        let ctx = SpawnContext {
            viewport: self.viewport,
            config: &self.config,
            measure: self.measure.as_ref(),
            frame: self.frame,
        };
        let mut dispatched = 0;
        let mut spawned = 0;
        for event in self.cursor.poll(&self.store, signal.time) {
            dispatched += 1;
            if self.instances.spawn(event, &ctx, &mut self.rng).is_some() {
                spawned += 1;
            }
        }

        if seek.strategy != SeekStrategy::Skipped || dispatched > 0 {
            debug!(
                frame = self.frame,
                time = signal.time,
                dispatched,
                spawned,
                live = self.instances.len(),
                "Tick"
            );
        }

        TickReport {
            seek: Some(seek),
            dispatched,
            spawned,
            dropped: dispatched - spawned,
            expired,
            live: self.instances.len(),
        }
    }

    /// Replaces the event store, resetting the cursor and clearing the screen
    pub fn reload(&mut self, store: Arc<EventStore>) {
        info!(events = store.len(), "Reloading event store");
        self.store = store;
        self.cursor.reset();
        self.instances.clear();
    }

    /// Instances to draw this frame; nothing while hidden
    pub fn instances(&self) -> impl Iterator<Item = &Instance> + '_ {
        let shown: &[Instance] = if self.config.visible {
            self.instances.as_slice()
        } else {
            &[]
        };
        shown.iter()
    }

    /// Validates and applies a new configuration.
    ///
    /// Capacity, speed and placement options affect future spawns only.
    pub fn update_config(&mut self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        self.instances.set_capacity(config.capacity);
        if let Some(seed) = config.seed {
            if self.config.seed != Some(seed) {
                self.rng = SmallRng::seed_from_u64(seed);
            }
        }
        self.config = config;
        Ok(())
    }

    /// Changes the instance cap without evicting anything
    pub fn set_capacity(&mut self, capacity: usize) {
        self.config.capacity = capacity;
        self.instances.set_capacity(capacity);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.config.visible = visible;
    }

    /// Changes the drawing surface size for future spawns
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn instance_manager(&self) -> &InstanceManager {
        &self.instances
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Number of playing ticks processed
    pub fn frame(&self) -> u64 {
        self.frame
    }
}
