//! Quality-aware rendering: distance LOD, viewport culling, text-object
//! reuse and the emergency override.
//!
//! # Invariants
//! - LOD thresholds are strictly increasing and scale never grows with
//!   distance.
//! - The optimizer only restores visibility it removed itself.
//! - The text cache never exceeds its capacity; eviction is LRU.
//! - Emergency mode flips only once its accumulator reaches the configured
//!   delay, and while active it overrides the quality level.

mod culling;
mod emergency;
mod lod;
mod optimizer;
mod stats;
mod text_cache;

#[cfg(test)]
mod testing;

pub use culling::{CullOutcome, Culler, culling_margin};
pub use emergency::{
    EmergencyConfig, EmergencyMode, EmergencySignal, EmergencyState, EmergencyTransition,
};
pub use lod::{EMERGENCY_LOD_BIAS, LodError, LodLevel, LodTable, default_levels, lod_distance_bias};
pub use optimizer::{RenderConfig, RenderingOptimizer};
pub use stats::RenderStats;
pub use text_cache::{CacheLookup, TextCache, TextCacheConfig, TextFactory, TextKey, TextStyle};

pub fn crate_info() -> &'static str {
    "frameguard-render v0.1.0"
}
