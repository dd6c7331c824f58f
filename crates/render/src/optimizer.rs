use std::collections::HashSet;

use frameguard_common::{EntityId, Viewport, VisualHandle};
use frameguard_quality::QualityLevel;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::culling::{CullOutcome, Culler, culling_margin};
use crate::emergency::{EmergencyConfig, EmergencyMode, EmergencySignal, EmergencyState, EmergencyTransition};
use crate::lod::{EMERGENCY_LOD_BIAS, LodError, LodLevel, LodTable, default_levels, lod_distance_bias};
use crate::stats::RenderStats;
use crate::text_cache::{CacheLookup, TextCache, TextCacheConfig, TextFactory, TextStyle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub lod_levels: Vec<LodLevel>,
    pub text_cache: TextCacheConfig,
    pub emergency: EmergencyConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            lod_levels: default_levels(),
            text_cache: TextCacheConfig::default(),
            emergency: EmergencyConfig::default(),
        }
    }
}

/// Applies the current quality budget to the host's visual objects.
pub struct RenderingOptimizer<F: TextFactory> {
    lod: LodTable,
    quality: QualityLevel,
    camera: Viewport,
    culler: Culler,
    lod_hidden: HashSet<EntityId>,
    text: TextCache<F>,
    /// Uncached text created this frame, destroyed at the next frame start.
    transient_text: Vec<F::Handle>,
    emergency: EmergencyMode,
    stats: RenderStats,
}

impl<F: TextFactory> RenderingOptimizer<F> {
    /// Fails only when the LOD table is invalid. Starts at `Medium`.
    pub fn new(config: RenderConfig, factory: F) -> Result<Self, LodError> {
        Ok(Self {
            lod: LodTable::new(config.lod_levels)?,
            quality: QualityLevel::Medium,
            camera: Viewport::default(),
            culler: Culler::new(),
            lod_hidden: HashSet::new(),
            text: TextCache::new(config.text_cache, factory),
            transient_text: Vec::new(),
            emergency: EmergencyMode::new(config.emergency),
            stats: RenderStats::default(),
        })
    }

    /// Adopt a new level. Takes effect on the next LOD or culling call.
    pub fn set_quality_level(&mut self, level: QualityLevel) {
        if level != self.quality {
            tracing::debug!(from = %self.quality, to = %level, "renderer quality updated");
        }
        self.quality = level;
    }

    pub fn quality_level(&self) -> QualityLevel {
        self.quality
    }

    /// Camera used for distance and culling this frame.
    pub fn set_camera(&mut self, camera: Viewport) {
        self.camera = camera;
    }

    pub fn camera(&self) -> &Viewport {
        &self.camera
    }

    /// Start a new frame. Destroys last frame's uncached text and returns
    /// the finished frame's stats.
    pub fn begin_frame(&mut self) -> RenderStats {
        self.release_transient_text();
        std::mem::take(&mut self.stats)
    }

    fn release_transient_text(&mut self) {
        if self.transient_text.is_empty() {
            return;
        }
        let released = self.transient_text.len();
        for handle in self.transient_text.drain(..) {
            self.text.destroy_uncached(handle);
        }
        tracing::trace!(released, "uncached text released");
    }

    /// Uncached text objects alive until the next [`begin_frame`](Self::begin_frame).
    pub fn transient_text_count(&self) -> usize {
        self.transient_text.len()
    }

    /// Distance divisor in effect right now.
    pub fn lod_bias(&self) -> f32 {
        if self.emergency.is_active() {
            EMERGENCY_LOD_BIAS
        } else {
            lod_distance_bias(self.quality)
        }
    }

    /// Pick the LOD tier for `object` by camera distance and apply it.
    /// Returns the tier index.
    pub fn apply_dynamic_lod<H: VisualHandle>(&mut self, object: &mut H) -> usize {
        let distance = object.position().distance(self.camera.center());
        let index = self.select_lod(distance);
        let Some(level) = self.lod.level(index).copied() else {
            return 0;
        };

        object.set_scale(level.scale);
        object.set_alpha(level.alpha);
        object.set_simplified(level.simplified || self.emergency.is_active());

        let id = object.id();
        if !level.visible {
            if object.is_visible() {
                object.set_visible(false);
                self.lod_hidden.insert(id);
            }
        } else if self.lod_hidden.remove(&id) {
            object.set_visible(true);
        }

        if index > 0 {
            self.stats.lod_reductions += 1;
        }
        index
    }

    /// LOD tier for a raw camera distance under the current bias.
    pub fn select_lod(&self, distance: f32) -> usize {
        self.lod.select(distance / self.lod_bias())
    }

    /// Hide objects outside the camera plus the current margin.
    pub fn cull_objects<H: VisualHandle>(&mut self, objects: &mut [H]) -> CullOutcome {
        let margin = self.culling_margin();
        let outcome = self.culler.cull(objects, &self.camera, margin);
        self.stats.objects_rendered += outcome.visible;
        self.stats.objects_culled += outcome.culled;
        outcome
    }

    /// Zero while in emergency mode.
    pub fn culling_margin(&self) -> f32 {
        if self.emergency.is_active() {
            0.0
        } else {
            culling_margin(self.quality)
        }
    }

    /// Text object for `(text, style)` placed at `position`.
    ///
    /// Served from the LRU cache normally. In emergency mode every call
    /// creates a fresh object that lives only until the next frame starts.
    pub fn get_cached_text(&mut self, text: &str, style: &TextStyle, position: Vec2, now_ms: f64) -> F::Handle {
        if self.emergency.is_active() {
            self.stats.cache_bypassed += 1;
            let handle = self.text.create_uncached(text, style, position);
            self.transient_text.push(handle.clone());
            return handle;
        }
        let (handle, lookup) = self.text.get(text, style, position, now_ms);
        match lookup {
            CacheLookup::Hit => self.stats.cache_hits += 1,
            CacheLookup::Miss => self.stats.cache_misses += 1,
        }
        handle
    }

    /// Feed one tick of signal to the emergency state machine.
    pub fn update_emergency(&mut self, signal: &EmergencySignal, delta_ms: f64) -> Option<EmergencyTransition> {
        let transition = self.emergency.update(signal, delta_ms)?;
        if transition.to == EmergencyState::Emergency {
            let dropped = self.text.len();
            self.text.clear();
            tracing::debug!(dropped, "text cache flushed for emergency mode");
        }
        Some(transition)
    }

    /// Destroy expired cached text. Returns how many entries went.
    pub fn prune_text_cache(&mut self, now_ms: f64) -> usize {
        self.text.prune_expired(now_ms)
    }

    /// Whether the last culling pass hid this object.
    pub fn is_culled(&self, id: EntityId) -> bool {
        self.culler.is_culled(id)
    }

    /// Stop tracking an object the host destroyed.
    pub fn forget(&mut self, id: EntityId) {
        self.culler.forget(id);
        self.lod_hidden.remove(&id);
    }

    /// Objects currently hidden by culling or by the farthest LOD tier.
    pub fn hidden_count(&self) -> usize {
        self.culler.culled_count() + self.lod_hidden.len()
    }

    pub fn is_emergency_mode(&self) -> bool {
        self.emergency.is_active()
    }

    pub fn emergency(&self) -> &EmergencyMode {
        &self.emergency
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn lod_table(&self) -> &LodTable {
        &self.lod
    }

    pub fn text_cache(&self) -> &TextCache<F> {
        &self.text
    }

    /// Cache access for hosts that manage text outside the optimizer.
    pub fn text_cache_mut(&mut self) -> &mut TextCache<F> {
        &mut self.text
    }
}
