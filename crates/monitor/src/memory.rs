use std::cell::Cell;
use std::rc::Rc;

use frameguard_common::RingBuffer;
use serde::{Deserialize, Serialize};

use crate::issue::{Detection, IssueKind, Severity};

/// Heuristic estimates never exceed this, so hosts without memory
/// introspection are never reported as under full pressure.
pub const HEURISTIC_USAGE_CAP: f64 = 0.7;
const HEURISTIC_BASELINE: f64 = 0.2;
const HEURISTIC_OBJECT_SPAN: f64 = 10_000.0;
/// Mean difference between the first and last third that counts as a trend.
const TREND_TOLERANCE: f64 = 0.02;

/// Heap figures reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapUsage {
    pub used_bytes: u64,
    pub limit_bytes: u64,
}

impl HeapUsage {
    /// Usage ratio, or `None` when the limit is unknown.
    pub fn ratio(&self) -> Option<f64> {
        if self.limit_bytes == 0 {
            return None;
        }
        Some((self.used_bytes as f64 / self.limit_bytes as f64).clamp(0.0, 1.0))
    }
}

/// Platform hook for heap introspection.
pub trait MemorySource {
    /// Current heap figures, or `None` if the platform cannot tell.
    fn heap_usage(&self) -> Option<HeapUsage>;
}

/// Source for platforms without memory introspection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIntrospection;

impl MemorySource for NoIntrospection {
    fn heap_usage(&self) -> Option<HeapUsage> {
        None
    }
}

/// Host-fed gauge: the host writes a usage ratio, the profiler reads it.
///
/// Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct MemoryGauge {
    ratio: Rc<Cell<Option<f64>>>,
}

impl MemoryGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `ratio` (0..=1) from the next sample on.
    pub fn set_ratio(&self, ratio: f64) {
        self.ratio.set(Some(ratio.clamp(0.0, 1.0)));
    }

    /// Go back to reporting no introspection.
    pub fn clear(&self) {
        self.ratio.set(None);
    }
}

impl MemorySource for MemoryGauge {
    fn heap_usage(&self) -> Option<HeapUsage> {
        const SCALE: f64 = 1_000_000.0;
        self.ratio.get().map(|r| HeapUsage {
            used_bytes: (r * SCALE).round() as u64,
            limit_bytes: SCALE as u64,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryProfilerConfig {
    /// Minimum spacing between two samples (ms).
    pub sample_interval_ms: f64,
    pub history_capacity: usize,
    /// Usage ratio above which memory pressure is reported.
    pub pressure_threshold: f64,
}

impl Default for MemoryProfilerConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1000.0,
            history_capacity: 60,
            pressure_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTrend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySample {
    pub timestamp_ms: f64,
    pub usage: f64,
    /// True when the value came from the heuristic rather than the platform.
    pub estimated: bool,
}

/// Rate-limited heap-pressure sampler.
pub struct MemoryProfiler {
    config: MemoryProfilerConfig,
    source: Box<dyn MemorySource>,
    history: RingBuffer<MemorySample>,
    last_check: Option<f64>,
    pressure_since: Option<f64>,
    object_count_hint: usize,
    current: f64,
    peak: f64,
}

impl MemoryProfiler {
    /// Profiler sampling `source` at most once per configured interval.
    pub fn new(config: MemoryProfilerConfig, source: Box<dyn MemorySource>) -> Self {
        Self {
            history: RingBuffer::new(config.history_capacity),
            config,
            source,
            last_check: None,
            pressure_since: None,
            object_count_hint: 0,
            current: 0.0,
            peak: 0.0,
        }
    }

    /// Sample the heap if the rate limit allows it.
    ///
    /// Returns a memory-pressure detection when the sample is above threshold.
    /// Calls inside the sampling interval are no-ops.
    pub fn check_memory_usage(&mut self, now_ms: f64) -> Option<Detection> {
        if let Some(last) = self.last_check {
            if now_ms - last < self.config.sample_interval_ms {
                return None;
            }
        }
        self.last_check = Some(now_ms);

        let (usage, estimated) = match self.source.heap_usage().and_then(|h| h.ratio()) {
            Some(ratio) => (ratio, false),
            None => (self.heuristic_estimate(), true),
        };
        self.current = usage;
        self.peak = self.peak.max(usage);
        self.history.push(MemorySample {
            timestamp_ms: now_ms,
            usage,
            estimated,
        });

        let threshold = self.config.pressure_threshold;
        if usage <= threshold {
            self.pressure_since = None;
            return None;
        }

        let since = *self.pressure_since.get_or_insert(now_ms);
        let detection = Detection {
            kind: IssueKind::MemoryPressure,
            severity: pressure_severity(usage - threshold),
            timestamp_ms: now_ms,
            duration_ms: now_ms - since,
            observed: usage,
        };
        tracing::debug!(usage, estimated, "memory pressure");
        Some(detection)
    }

    /// Estimate used when the platform exposes no heap figures.
    fn heuristic_estimate(&self) -> f64 {
        let load = (self.object_count_hint as f64 / HEURISTIC_OBJECT_SPAN).min(1.0);
        (HEURISTIC_BASELINE + 0.5 * load).min(HEURISTIC_USAGE_CAP)
    }

    /// Trend over the history window, comparing its first and last thirds.
    pub fn trend(&self) -> MemoryTrend {
        let n = self.history.len();
        if n < 3 {
            return MemoryTrend::Stable;
        }
        let third = n / 3;
        let first = mean_usage(self.history.iter().take(third), third);
        let last = mean_usage(self.history.iter().skip(n - third), third);
        let delta = last - first;
        if delta > TREND_TOLERANCE {
            MemoryTrend::Increasing
        } else if delta < -TREND_TOLERANCE {
            MemoryTrend::Decreasing
        } else {
            MemoryTrend::Stable
        }
    }

    /// Live object count used by the heuristic fallback.
    pub fn set_object_count_hint(&mut self, count: usize) {
        self.object_count_hint = count;
    }

    /// Usage ratio above which a sample counts as pressure.
    pub fn set_pressure_threshold(&mut self, threshold: f64) {
        self.config.pressure_threshold = threshold;
    }

    /// Usage ratio from the latest sample.
    pub fn current_usage(&self) -> f64 {
        self.current
    }

    /// Highest usage ratio seen since construction.
    pub fn peak_usage(&self) -> f64 {
        self.peak
    }

    /// Retained samples, oldest first.
    pub fn history(&self) -> &RingBuffer<MemorySample> {
        &self.history
    }

    pub fn config(&self) -> &MemoryProfilerConfig {
        &self.config
    }
}

impl std::fmt::Debug for MemoryProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryProfiler")
            .field("config", &self.config)
            .field("current", &self.current)
            .field("peak", &self.peak)
            .field("samples", &self.history.len())
            .finish()
    }
}

fn mean_usage<'a>(samples: impl Iterator<Item = &'a MemorySample>, count: usize) -> f64 {
    samples.map(|s| s.usage).sum::<f64>() / count as f64
}

fn pressure_severity(excess: f64) -> Severity {
    if excess >= 0.1 {
        Severity::High
    } else if excess >= 0.05 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiler_with_gauge() -> (MemoryProfiler, MemoryGauge) {
        let gauge = MemoryGauge::new();
        let profiler = MemoryProfiler::new(MemoryProfilerConfig::default(), Box::new(gauge.clone()));
        (profiler, gauge)
    }

    #[test]
    fn sampling_is_rate_limited() {
        let (mut profiler, gauge) = profiler_with_gauge();
        gauge.set_ratio(0.5);
        profiler.check_memory_usage(0.0);
        gauge.set_ratio(0.6);
        profiler.check_memory_usage(500.0);
        assert_eq!(profiler.current_usage(), 0.5);
        profiler.check_memory_usage(1000.0);
        assert_eq!(profiler.current_usage(), 0.6);
        assert_eq!(profiler.history().len(), 2);
    }

    #[test]
    fn heuristic_never_exceeds_cap() {
        let mut profiler = MemoryProfiler::new(MemoryProfilerConfig::default(), Box::new(NoIntrospection));
        profiler.set_object_count_hint(usize::MAX);
        assert!(profiler.check_memory_usage(0.0).is_none());
        assert_eq!(profiler.current_usage(), HEURISTIC_USAGE_CAP);
        assert!(profiler.history().latest().unwrap().estimated);
    }

    #[test]
    fn heuristic_baseline_without_objects() {
        let mut profiler = MemoryProfiler::new(MemoryProfilerConfig::default(), Box::new(NoIntrospection));
        profiler.check_memory_usage(0.0);
        assert!((profiler.current_usage() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn pressure_severity_scales_with_excess() {
        let (mut profiler, gauge) = profiler_with_gauge();
        gauge.set_ratio(0.82);
        assert_eq!(profiler.check_memory_usage(0.0).unwrap().severity, Severity::Low);
        gauge.set_ratio(0.87);
        assert_eq!(profiler.check_memory_usage(1000.0).unwrap().severity, Severity::Medium);
        gauge.set_ratio(0.95);
        let d = profiler.check_memory_usage(2000.0).unwrap();
        assert_eq!(d.severity, Severity::High);
        assert_eq!(d.kind, IssueKind::MemoryPressure);
        assert_eq!(d.duration_ms, 2000.0);
    }

    #[test]
    fn no_issue_below_threshold() {
        let (mut profiler, gauge) = profiler_with_gauge();
        gauge.set_ratio(0.8);
        assert!(profiler.check_memory_usage(0.0).is_none());
    }

    #[test]
    fn zero_limit_falls_back_to_heuristic() {
        let usage = HeapUsage {
            used_bytes: 10,
            limit_bytes: 0,
        };
        assert!(usage.ratio().is_none());
    }

    #[test]
    fn trend_detection() {
        let (mut profiler, gauge) = profiler_with_gauge();
        for i in 0..9 {
            gauge.set_ratio(0.3 + i as f64 * 0.05);
            profiler.check_memory_usage(i as f64 * 1000.0);
        }
        assert_eq!(profiler.trend(), MemoryTrend::Increasing);
        assert!((profiler.peak_usage() - 0.7).abs() < 1e-9);

        let (mut profiler, gauge) = profiler_with_gauge();
        gauge.set_ratio(0.4);
        for i in 0..9 {
            profiler.check_memory_usage(i as f64 * 1000.0);
        }
        assert_eq!(profiler.trend(), MemoryTrend::Stable);
    }

    #[test]
    fn trend_needs_three_samples() {
        let (mut profiler, gauge) = profiler_with_gauge();
        gauge.set_ratio(0.1);
        profiler.check_memory_usage(0.0);
        gauge.set_ratio(0.9);
        profiler.check_memory_usage(1000.0);
        assert_eq!(profiler.trend(), MemoryTrend::Stable);
    }
}
