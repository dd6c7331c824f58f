use serde::{Deserialize, Serialize};

use crate::metrics::PerformanceMetrics;

/// What kind of degradation a detector observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Stutter,
    LowFps,
    MemoryPressure,
}

impl IssueKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Stutter => "stutter",
            Self::LowFps => "low_fps",
            Self::MemoryPressure => "memory_pressure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Raw finding from a detector, before the monitor attaches a metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub kind: IssueKind,
    pub severity: Severity,
    pub timestamp_ms: f64,
    pub duration_ms: f64,
    /// The value that tripped the detector: frame time, FPS or usage ratio.
    pub observed: f64,
}

impl Detection {
    /// Attach a metrics snapshot to make the reported issue.
    pub fn into_issue(self, metrics: PerformanceMetrics) -> PerformanceIssue {
        PerformanceIssue {
            kind: self.kind,
            severity: self.severity,
            timestamp_ms: self.timestamp_ms,
            duration_ms: self.duration_ms,
            observed: self.observed,
            metrics,
        }
    }
}

/// A classified degradation event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub timestamp_ms: f64,
    pub duration_ms: f64,
    pub observed: f64,
    /// Metrics as they stood when the issue was detected.
    pub metrics: PerformanceMetrics,
}

impl PerformanceIssue {
    pub fn is_high(&self) -> bool {
        self.severity == Severity::High
    }
}

impl std::fmt::Display for PerformanceIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) at {:.0}ms: observed={:.3} duration={:.1}ms fps={} score={}",
            self.kind.label(),
            self.severity.label(),
            self.timestamp_ms,
            self.observed,
            self.duration_ms,
            self.metrics.current_fps,
            self.metrics.performance_score
        )
    }
}
