use serde::Serialize;

/// Per-frame rendering diagnostics for an on-screen overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RenderStats {
    pub objects_rendered: usize,
    pub objects_culled: usize,
    pub lod_reductions: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Text requests served without the cache during emergency mode.
    pub cache_bypassed: u64,
}

impl RenderStats {
    /// Fraction of cached text requests that hit, 0 when there were none.
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
