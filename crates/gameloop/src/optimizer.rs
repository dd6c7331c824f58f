use std::time::{Duration, Instant};

use frameguard_common::{RingBuffer, Viewport};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An obstacle, item or other per-frame simulated entity.
pub trait LoopEntity {
    fn position(&self) -> Vec2;

    /// Advance the entity. Only called while it is near the camera.
    fn tick(&mut self, delta_ms: f64, now_ms: f64);

    fn is_expired(&self, now_ms: f64) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Entities per batch.
    pub batch_size: usize,
    /// World units beyond the camera edge that still get updated.
    pub cull_margin: f32,
    /// Number of pass timings kept per pass kind.
    pub timing_history: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            cull_margin: 200.0,
            timing_history: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Obstacles,
    Items,
}

impl PassKind {
    /// Name the pass is published under on the monitor.
    pub fn section_name(self) -> &'static str {
        match self {
            Self::Obstacles => "update_obstacles",
            Self::Items => "update_items",
        }
    }
}

/// Counts and timing from one update pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassStats {
    pub processed: usize,
    pub culled: usize,
    pub removed: usize,
    pub batches: usize,
    pub elapsed: Duration,
}

impl PassStats {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Running totals across passes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStats {
    pub last_obstacles: PassStats,
    pub last_items: PassStats,
    pub total_processed: u64,
    pub total_culled: u64,
    pub total_removed: u64,
    pub passes: u64,
}

pub struct GameLoopOptimizer {
    config: LoopConfig,
    camera: Viewport,
    stats: LoopStats,
    obstacle_timings: RingBuffer<Duration>,
    item_timings: RingBuffer<Duration>,
}

impl GameLoopOptimizer {
    /// A zero batch size is raised to 1.
    pub fn new(config: LoopConfig) -> Self {
        let config = LoopConfig {
            batch_size: config.batch_size.max(1),
            ..config
        };
        Self {
            obstacle_timings: RingBuffer::new(config.timing_history),
            item_timings: RingBuffer::new(config.timing_history),
            camera: Viewport::default(),
            stats: LoopStats::default(),
            config,
        }
    }

    /// Camera used for culling in the next pass.
    pub fn set_camera(&mut self, camera: Viewport) {
        self.camera = camera;
    }

    /// Extra world units kept active around the camera. Negative is zero.
    pub fn set_cull_margin(&mut self, margin: f32) {
        self.config.cull_margin = margin.max(0.0);
    }

    /// Tick obstacles near the camera and remove expired ones through `on_remove`.
    pub fn update_obstacles<E: LoopEntity>(
        &mut self,
        obstacles: &mut Vec<E>,
        delta_ms: f64,
        now_ms: f64,
        on_remove: impl FnMut(E),
    ) -> PassStats {
        self.run_pass(PassKind::Obstacles, obstacles, delta_ms, now_ms, on_remove)
    }

    /// Same as [`update_obstacles`](Self::update_obstacles) for collectible items.
    pub fn update_items<E: LoopEntity>(
        &mut self,
        items: &mut Vec<E>,
        delta_ms: f64,
        now_ms: f64,
        on_remove: impl FnMut(E),
    ) -> PassStats {
        self.run_pass(PassKind::Items, items, delta_ms, now_ms, on_remove)
    }

    fn run_pass<E: LoopEntity>(
        &mut self,
        kind: PassKind,
        entities: &mut Vec<E>,
        delta_ms: f64,
        now_ms: f64,
        mut on_remove: impl FnMut(E),
    ) -> PassStats {
        let _span = tracing::info_span!("loop_pass", pass = kind.section_name()).entered();
        let start = Instant::now();
        let bounds = self.camera.bounds().expanded(self.config.cull_margin);

        let mut pass = PassStats::default();
        for batch in entities.chunks_mut(self.config.batch_size) {
            pass.batches += 1;
            for entity in batch {
                if entity.is_expired(now_ms) {
                    continue;
                }
                if !bounds.contains_point(entity.position()) {
                    pass.culled += 1;
                    continue;
                }
                entity.tick(delta_ms, now_ms);
                pass.processed += 1;
            }
        }

        if entities.iter().any(|e| e.is_expired(now_ms)) {
            let mut kept = Vec::with_capacity(entities.len());
            for entity in entities.drain(..) {
                if entity.is_expired(now_ms) {
                    pass.removed += 1;
                    on_remove(entity);
                } else {
                    kept.push(entity);
                }
            }
            *entities = kept;
        }

        pass.elapsed = start.elapsed();
        match kind {
            PassKind::Obstacles => {
                self.stats.last_obstacles = pass;
                self.obstacle_timings.push(pass.elapsed);
            }
            PassKind::Items => {
                self.stats.last_items = pass;
                self.item_timings.push(pass.elapsed);
            }
        }
        self.stats.total_processed += pass.processed as u64;
        self.stats.total_culled += pass.culled as u64;
        self.stats.total_removed += pass.removed as u64;
        self.stats.passes += 1;

        tracing::trace!(
            processed = pass.processed,
            culled = pass.culled,
            removed = pass.removed,
            batches = pass.batches,
            "loop pass complete"
        );
        pass
    }

    /// Mean pass duration over the timing history.
    pub fn average_pass_time(&self, kind: PassKind) -> Duration {
        let timings = match kind {
            PassKind::Obstacles => &self.obstacle_timings,
            PassKind::Items => &self.item_timings,
        };
        if timings.is_empty() {
            return Duration::ZERO;
        }
        timings.iter().sum::<Duration>() / timings.len() as u32
    }

    /// Lifetime totals plus the last pass of each kind.
    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }
}

impl Default for GameLoopOptimizer {
    fn default() -> Self {
        Self::new(LoopConfig::default())
    }
}
