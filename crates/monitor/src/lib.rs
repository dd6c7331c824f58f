//! Performance monitoring: frame timing, memory pressure, composite score,
//! classified issue stream.
//!
//! # Invariants
//! - `start_frame` precedes all work for a tick, `end_frame` follows it.
//! - Issues are immutable once created and carry the metrics snapshot taken
//!   when they were detected.
//! - All histories are fixed-capacity ring buffers.
//! - A failing issue listener never halts the frame or the other listeners.

mod frame_tracker;
mod issue;
mod memory;
mod metrics;
mod monitor;

pub use frame_tracker::{FrameTimeTracker, FrameTrackerConfig, stutter_severity};
pub use issue::{Detection, IssueKind, PerformanceIssue, Severity};
pub use memory::{
    HEURISTIC_USAGE_CAP, HeapUsage, MemoryGauge, MemoryProfiler, MemoryProfilerConfig,
    MemorySample, MemorySource, MemoryTrend, NoIntrospection,
};
pub use metrics::{PerformanceMetrics, performance_score};
pub use monitor::{MonitorConfig, MonitorThresholds, PerformanceMonitor, SectionTiming, ThresholdsPatch};

pub fn crate_info() -> &'static str {
    "frameguard-monitor v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("monitor"));
    }
}
