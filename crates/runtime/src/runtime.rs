use std::time::Instant;

use frameguard_collision::{Collider, CollisionReport, SpatialCollisionIndex};
use frameguard_common::{Aabb, Clock, Viewport, VisualHandle};
use frameguard_gameloop::{GameLoopOptimizer, LoopEntity, PassKind, PassStats};
use frameguard_monitor::{MemorySource, PerformanceIssue, PerformanceMetrics, PerformanceMonitor};
use frameguard_quality::{DynamicQualityManager, QualityChange, QualityLevel, QualitySignal};
use frameguard_render::{
    CullOutcome, EmergencySignal, EmergencyTransition, RenderStats, RenderingOptimizer, TextFactory,
};

use crate::config::{ConfigError, RuntimeConfig};

/// Section names published to the monitor.
pub const COLLISION_SECTION: &str = "collision";
pub const RENDER_SECTION: &str = "render";

/// What happened at the start of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStart {
    /// Quality change decided last frame and applied now.
    pub quality_change: Option<QualityChange>,
    pub quality: QualityLevel,
    /// Diagnostics of the frame that just finished.
    pub previous_render_stats: RenderStats,
}

/// What happened at the end of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub metrics: PerformanceMetrics,
    pub issues: Vec<PerformanceIssue>,
    /// Level staged for the next frame, if this frame decided a change.
    pub staged_quality: Option<QualityLevel>,
    pub emergency: Option<EmergencyTransition>,
}

/// Owns every adaptation component and wires them together each frame.
///
/// Frame order: [`begin_frame`](Self::begin_frame), then collision, update
/// and render passes, then [`end_frame`](Self::end_frame).
pub struct AdaptiveRuntime<F: TextFactory> {
    monitor: PerformanceMonitor,
    quality: DynamicQualityManager,
    collision: SpatialCollisionIndex,
    renderer: RenderingOptimizer<F>,
    game_loop: GameLoopOptimizer,
    live_obstacles: usize,
    live_items: usize,
}

impl<F: TextFactory> AdaptiveRuntime<F> {
    /// Build every component from `config`. `device_hint` overrides the detected starting level.
    pub fn new(
        config: RuntimeConfig,
        clock: Box<dyn Clock>,
        memory: Box<dyn MemorySource>,
        text_factory: F,
        device_hint: Option<QualityLevel>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let quality = DynamicQualityManager::new(config.quality, device_hint);
        let mut renderer = RenderingOptimizer::new(config.render, text_factory)?;
        renderer.set_quality_level(quality.current());
        Ok(Self {
            monitor: PerformanceMonitor::new(config.monitor, clock, memory),
            quality,
            collision: SpatialCollisionIndex::new(config.collision),
            renderer,
            game_loop: GameLoopOptimizer::new(config.game_loop),
            live_obstacles: 0,
            live_items: 0,
        })
    }

    /// Open a frame: apply last frame's quality decision and set the camera.
    pub fn begin_frame(&mut self, camera: Viewport) -> FrameStart {
        self.monitor.start_frame();
        let now = self.monitor.now_ms();
        let quality_change = self.quality.begin_tick(now);
        if let Some(change) = quality_change {
            self.renderer.set_quality_level(change.to);
        }
        self.renderer.set_camera(camera);
        self.game_loop.set_camera(camera);
        FrameStart {
            quality_change,
            quality: self.quality.current(),
            previous_render_stats: self.renderer.begin_frame(),
        }
    }

    /// Close the frame: record timing, let the quality manager and the
    /// emergency machine react.
    pub fn end_frame(&mut self) -> FrameReport {
        self.monitor
            .set_object_count_hint(self.live_obstacles + self.live_items);
        let issues = self.monitor.end_frame();
        let now = self.monitor.now_ms();
        let metrics = self.monitor.metrics();

        let staged_quality = self.quality.evaluate(QualitySignal {
            now_ms: now,
            fps: metrics.current_fps,
            issues: &issues,
            issue_active: self.monitor.is_issue_active_at(now),
        });

        let delta = self.monitor.frame_tracker().last_frame_time().unwrap_or(0.0);
        let signal = EmergencySignal::from_metrics(&metrics, delta);
        let emergency = self.renderer.update_emergency(&signal, delta);
        self.renderer.prune_text_cache(now);

        FrameReport {
            metrics,
            issues,
            staged_quality,
            emergency,
        }
    }

    /// Player-versus-world collision query, timed onto the metrics surface.
    pub fn query_collisions<O: Collider, I: Collider>(
        &mut self,
        player: &Aabb,
        obstacles: &[O],
        items: &[I],
        on_obstacle_hit: impl FnMut(usize, &O),
        on_item_hit: impl FnMut(usize, &I),
    ) -> CollisionReport {
        let start = Instant::now();
        let report = self
            .collision
            .query(player, obstacles, items, on_obstacle_hit, on_item_hit);
        self.monitor
            .record_section(COLLISION_SECTION, start.elapsed().as_secs_f64() * 1000.0);
        report
    }

    /// Run the obstacle pass. Removed entities are dropped from the
    /// renderer's visibility tracking before `on_remove` sees them.
    pub fn update_obstacles<E: LoopEntity + VisualHandle>(
        &mut self,
        obstacles: &mut Vec<E>,
        delta_ms: f64,
        mut on_remove: impl FnMut(E),
    ) -> PassStats {
        let now = self.monitor.now_ms();
        let renderer = &mut self.renderer;
        let pass = self.game_loop.update_obstacles(obstacles, delta_ms, now, |entity| {
            renderer.forget(entity.id());
            on_remove(entity);
        });
        self.live_obstacles = obstacles.len();
        self.monitor
            .record_section(PassKind::Obstacles.section_name(), pass.elapsed_ms());
        pass
    }

    /// Item counterpart of [`update_obstacles`](Self::update_obstacles).
    pub fn update_items<E: LoopEntity + VisualHandle>(
        &mut self,
        items: &mut Vec<E>,
        delta_ms: f64,
        mut on_remove: impl FnMut(E),
    ) -> PassStats {
        let now = self.monitor.now_ms();
        let renderer = &mut self.renderer;
        let pass = self.game_loop.update_items(items, delta_ms, now, |entity| {
            renderer.forget(entity.id());
            on_remove(entity);
        });
        self.live_items = items.len();
        self.monitor
            .record_section(PassKind::Items.section_name(), pass.elapsed_ms());
        pass
    }

    /// Cull `objects` against the camera, then apply LOD to everything still
    /// in view.
    pub fn optimize_visuals<H: VisualHandle>(&mut self, objects: &mut [H]) -> CullOutcome {
        let _span = tracing::info_span!("render_pass", objects = objects.len()).entered();
        let start = Instant::now();
        let outcome = self.renderer.cull_objects(objects);
        for object in objects.iter_mut() {
            if !self.renderer.is_culled(object.id()) {
                self.renderer.apply_dynamic_lod(object);
            }
        }
        self.monitor
            .record_section(RENDER_SECTION, start.elapsed().as_secs_f64() * 1000.0);
        outcome
    }

    /// Level in effect for the current frame.
    pub fn current_quality(&self) -> QualityLevel {
        self.quality.current()
    }

    pub fn is_emergency_mode(&self) -> bool {
        self.renderer.is_emergency_mode()
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut PerformanceMonitor {
        &mut self.monitor
    }

    pub fn quality(&self) -> &DynamicQualityManager {
        &self.quality
    }

    pub fn quality_mut(&mut self) -> &mut DynamicQualityManager {
        &mut self.quality
    }

    pub fn collision(&self) -> &SpatialCollisionIndex {
        &self.collision
    }

    pub fn renderer(&self) -> &RenderingOptimizer<F> {
        &self.renderer
    }

    /// Direct access for text requests and manual emergency control.
    pub fn renderer_mut(&mut self) -> &mut RenderingOptimizer<F> {
        &mut self.renderer
    }

    pub fn game_loop(&self) -> &GameLoopOptimizer {
        &self.game_loop
    }
}
