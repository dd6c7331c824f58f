use std::collections::BTreeMap;

use frameguard_common::{Clock, ListenerId, ListenerResult, ListenerSet};
use serde::{Deserialize, Serialize};

use crate::frame_tracker::{FrameTimeTracker, FrameTrackerConfig};
use crate::issue::{Detection, PerformanceIssue};
use crate::memory::{MemoryProfiler, MemoryProfilerConfig, MemorySource, MemoryTrend};
use crate::metrics::{PerformanceMetrics, performance_score};

/// Monitor configuration. Field defaults are the documented thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub frames: FrameTrackerConfig,
    pub memory: MemoryProfilerConfig,
    /// How long after the last issue `is_performance_issue_active` stays true (ms).
    pub issue_window_ms: f64,
    /// Frame rate the composite score treats as full marks.
    pub target_fps: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            frames: FrameTrackerConfig::default(),
            memory: MemoryProfilerConfig::default(),
            issue_window_ms: 5000.0,
            target_fps: 60.0,
        }
    }
}

/// Partial threshold update. Absent fields are left alone; unknown keys in
/// the serialized form are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsPatch {
    pub stutter_threshold: Option<f64>,
    pub min_fps: Option<f64>,
    pub memory_pressure_threshold: Option<f64>,
    pub issue_window: Option<f64>,
    pub target_fps: Option<f64>,
}

impl ThresholdsPatch {
    /// Parse a partial thresholds object. Unknown keys are ignored.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Current effective thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorThresholds {
    pub stutter_threshold: f64,
    pub min_fps: f64,
    pub memory_pressure_threshold: f64,
    pub issue_window: f64,
    pub target_fps: f64,
}

/// Timing a subsystem published through [`PerformanceMonitor::record_section`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionTiming {
    pub last_ms: f64,
    /// Exponential moving average, weight 0.1 on the newest sample.
    pub average_ms: f64,
    pub max_ms: f64,
    pub calls: u64,
}

impl SectionTiming {
    fn observe(&mut self, ms: f64) {
        self.average_ms = if self.calls == 0 {
            ms
        } else {
            self.average_ms * 0.9 + ms * 0.1
        };
        self.last_ms = ms;
        self.max_ms = self.max_ms.max(ms);
        self.calls += 1;
    }
}

/// Aggregates frame timing and memory pressure into a metrics snapshot and a
/// classified issue stream.
///
/// The host brackets each tick with [`start_frame`](Self::start_frame) and
/// [`end_frame`](Self::end_frame); everything else reads the snapshot.
pub struct PerformanceMonitor {
    clock: Box<dyn Clock>,
    frames: FrameTimeTracker,
    memory: MemoryProfiler,
    listeners: ListenerSet<PerformanceIssue>,
    metrics: PerformanceMetrics,
    sections: BTreeMap<String, SectionTiming>,
    frame_start: Option<f64>,
    last_issue_time: Option<f64>,
    issue_window_ms: f64,
    target_fps: f64,
    frame_count: u64,
    issue_count: u64,
}

impl PerformanceMonitor {
    /// Create a monitor reading time from `clock` and memory from `memory`.
    pub fn new(config: MonitorConfig, clock: Box<dyn Clock>, memory: Box<dyn MemorySource>) -> Self {
        Self {
            clock,
            frames: FrameTimeTracker::new(config.frames),
            memory: MemoryProfiler::new(config.memory, memory),
            listeners: ListenerSet::new(),
            metrics: PerformanceMetrics::default(),
            sections: BTreeMap::new(),
            frame_start: None,
            last_issue_time: None,
            issue_window_ms: config.issue_window_ms,
            target_fps: config.target_fps,
            frame_count: 0,
            issue_count: 0,
        }
    }

    /// Mark the start of a tick.
    pub fn start_frame(&mut self) {
        self.frame_start = Some(self.clock.now_ms());
    }

    /// Close the tick opened by [`start_frame`](Self::start_frame).
    ///
    /// Returns the issues detected during this frame, after they have been
    /// delivered to listeners. Without a matching `start_frame` nothing is
    /// recorded.
    pub fn end_frame(&mut self) -> Vec<PerformanceIssue> {
        let now = self.clock.now_ms();
        let Some(start) = self.frame_start.take() else {
            tracing::warn!("end_frame called without start_frame; frame ignored");
            return Vec::new();
        };
        self.record_frame_time(now - start, now)
    }

    /// Record an externally measured frame and poll memory.
    ///
    /// Used by `end_frame`, and directly by hosts that already know their
    /// frame delta.
    pub fn record_frame_time(&mut self, frame_time_ms: f64, now_ms: f64) -> Vec<PerformanceIssue> {
        self.frame_count += 1;
        let mut detections = self.frames.record_frame(frame_time_ms, now_ms);
        if let Some(detection) = self.memory.check_memory_usage(now_ms) {
            detections.push(detection);
        }

        self.refresh_metrics();
        let issues = self.publish(detections);

        tracing::trace!(
            frame = self.frame_count,
            fps = self.metrics.current_fps,
            score = self.metrics.performance_score,
            issues = issues.len(),
            "frame recorded"
        );
        issues
    }

    fn refresh_metrics(&mut self) {
        let fps = self.frames.current_fps();
        self.metrics = PerformanceMetrics {
            current_fps: fps,
            average_frame_time: self.frames.average_frame_time(),
            memory_usage: self.memory.current_usage(),
            stutter_count: self.frames.stutter_count(),
            last_stutter_time: self.frames.last_stutter_time(),
            performance_score: performance_score(
                fps as f64,
                self.target_fps,
                self.frames.frame_time_std_dev(),
                self.frames.recent_stutter_count(),
            ),
        };
    }

    fn publish(&mut self, detections: Vec<Detection>) -> Vec<PerformanceIssue> {
        let mut issues = Vec::with_capacity(detections.len());
        for detection in detections {
            let issue = detection.into_issue(self.metrics.clone());
            tracing::debug!(%issue, "performance issue");
            self.last_issue_time = Some(issue.timestamp_ms);
            self.issue_count += 1;
            self.listeners.emit(&issue);
            issues.push(issue);
        }
        issues
    }

    /// Latest metrics snapshot.
    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics.clone()
    }

    pub fn current_fps(&self) -> u32 {
        self.metrics.current_fps
    }

    /// Score (0..=100) from the last completed frame.
    pub fn performance_score(&self) -> u8 {
        self.metrics.performance_score
    }

    /// True while the most recent issue is younger than the issue window.
    ///
    /// Consumers use this to stay conservative right after a disturbance even
    /// if the instantaneous signal has already recovered.
    pub fn is_performance_issue_active(&self) -> bool {
        self.is_issue_active_at(self.clock.now_ms())
    }

    /// Whether an issue was raised within the active window before `now_ms`.
    pub fn is_issue_active_at(&self, now_ms: f64) -> bool {
        self.last_issue_time
            .is_some_and(|t| now_ms - t < self.issue_window_ms)
    }

    pub fn last_issue_time(&self) -> Option<f64> {
        self.last_issue_time
    }

    /// Subscribe to detected issues. A failing listener is logged and skipped.
    pub fn on_performance_issue(
        &mut self,
        listener: impl FnMut(&PerformanceIssue) -> ListenerResult + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Listener errors and panics since construction.
    pub fn listener_failures(&self) -> u64 {
        self.listeners.failure_count()
    }

    /// Merge recognized thresholds. Non-finite or non-positive values are
    /// skipped with a warning rather than rejected.
    pub fn set_thresholds(&mut self, patch: &ThresholdsPatch) {
        let valid = |name: &str, v: f64| {
            let ok = v.is_finite() && v > 0.0;
            if !ok {
                tracing::warn!(threshold = name, value = v, "ignoring invalid threshold");
            }
            ok
        };
        if let Some(v) = patch.stutter_threshold.filter(|&v| valid("stutter_threshold", v)) {
            self.frames.set_stutter_threshold(v);
        }
        if let Some(v) = patch.min_fps.filter(|&v| valid("min_fps", v)) {
            self.frames.set_min_fps(v);
        }
        if let Some(v) = patch
            .memory_pressure_threshold
            .filter(|&v| valid("memory_pressure_threshold", v))
        {
            self.memory.set_pressure_threshold(v);
        }
        if let Some(v) = patch.issue_window.filter(|&v| valid("issue_window", v)) {
            self.issue_window_ms = v;
        }
        if let Some(v) = patch.target_fps.filter(|&v| valid("target_fps", v)) {
            self.target_fps = v;
        }
    }

    /// Thresholds currently in effect.
    pub fn thresholds(&self) -> MonitorThresholds {
        MonitorThresholds {
            stutter_threshold: self.frames.config().stutter_threshold_ms,
            min_fps: self.frames.config().min_fps,
            memory_pressure_threshold: self.memory.config().pressure_threshold,
            issue_window: self.issue_window_ms,
            target_fps: self.target_fps,
        }
    }

    /// Publish a subsystem timing onto the metrics surface.
    pub fn record_section(&mut self, name: &str, ms: f64) {
        self.sections.entry(name.to_string()).or_default().observe(ms);
    }

    pub fn section_timings(&self) -> &BTreeMap<String, SectionTiming> {
        &self.sections
    }

    /// Feed the live object count to the memory heuristic.
    pub fn set_object_count_hint(&mut self, count: usize) {
        self.memory.set_object_count_hint(count);
    }

    pub fn memory_trend(&self) -> MemoryTrend {
        self.memory.trend()
    }

    pub fn frame_tracker(&self) -> &FrameTimeTracker {
        &self.frames
    }

    pub fn memory_profiler(&self) -> &MemoryProfiler {
        &self.memory
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn issue_count(&self) -> u64 {
        self.issue_count
    }

    /// Current reading of the injected clock.
    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }
}

impl std::fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("metrics", &self.metrics)
            .field("frames", &self.frame_count)
            .field("issues", &self.issue_count)
            .field("listeners", &self.listeners)
            .finish()
    }
}
