use frameguard_common::RingBuffer;
use serde::{Deserialize, Serialize};

use crate::issue::{Detection, IssueKind, Severity};

/// Frame-time tracker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameTrackerConfig {
    /// Number of frame times kept in the rolling window.
    pub capacity: usize,
    /// A frame longer than this (ms) is a stutter.
    pub stutter_threshold_ms: f64,
    /// Rolling FPS below this raises a low-FPS issue.
    pub min_fps: f64,
    /// Samples required before the low-FPS detector arms.
    pub min_samples_for_fps_check: usize,
    /// Minimum spacing between two low-FPS reports (ms).
    pub low_fps_report_interval_ms: f64,
}

impl Default for FrameTrackerConfig {
    fn default() -> Self {
        Self {
            capacity: 120,
            stutter_threshold_ms: 100.0,
            min_fps: 30.0,
            min_samples_for_fps_check: 30,
            low_fps_report_interval_ms: 1000.0,
        }
    }
}

/// Rolling frame-time window with stutter and low-FPS detection.
#[derive(Debug, Clone)]
pub struct FrameTimeTracker {
    config: FrameTrackerConfig,
    samples: RingBuffer<f64>,
    average: f64,
    stutter_count: u64,
    last_stutter_time: Option<f64>,
    last_low_fps_report: Option<f64>,
}

impl FrameTimeTracker {
    pub fn new(config: FrameTrackerConfig) -> Self {
        Self {
            samples: RingBuffer::new(config.capacity),
            config,
            average: 0.0,
            stutter_count: 0,
            last_stutter_time: None,
            last_low_fps_report: None,
        }
    }

    /// Record one frame and return whatever it tripped.
    ///
    /// Negative or non-finite frame times are clamped to zero.
    pub fn record_frame(&mut self, frame_time_ms: f64, timestamp_ms: f64) -> Vec<Detection> {
        let frame_time = if frame_time_ms.is_finite() {
            frame_time_ms.max(0.0)
        } else {
            0.0
        };
        self.samples.push(frame_time);
        self.average = self.samples.iter().sum::<f64>() / self.samples.len() as f64;

        let mut detections = Vec::new();

        if frame_time > self.config.stutter_threshold_ms {
            self.stutter_count += 1;
            self.last_stutter_time = Some(timestamp_ms);
            detections.push(Detection {
                kind: IssueKind::Stutter,
                severity: stutter_severity(frame_time, self.config.stutter_threshold_ms),
                timestamp_ms,
                duration_ms: frame_time,
                observed: frame_time,
            });
        }

        if self.samples.len() >= self.config.min_samples_for_fps_check {
            let fps = self.current_fps() as f64;
            let due = self
                .last_low_fps_report
                .is_none_or(|last| timestamp_ms - last >= self.config.low_fps_report_interval_ms);
            if fps > 0.0 && fps < self.config.min_fps && due {
                self.last_low_fps_report = Some(timestamp_ms);
                detections.push(Detection {
                    kind: IssueKind::LowFps,
                    severity: low_fps_severity(fps, self.config.min_fps),
                    timestamp_ms,
                    duration_ms: self.samples.iter().sum(),
                    observed: fps,
                });
            }
        }

        detections
    }

    /// Rolling FPS, `round(1000 / average)`. Zero before the first frame and
    /// while every sample in the window is zero-length, since neither says
    /// anything about the frame rate.
    pub fn current_fps(&self) -> u32 {
        if self.samples.is_empty() || self.average <= 0.0 {
            return 0;
        }
        (1000.0 / self.average).round() as u32
    }

    /// Mean frame time over the window (ms).
    pub fn average_frame_time(&self) -> f64 {
        self.average
    }

    /// Population standard deviation of the window.
    pub fn frame_time_std_dev(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mean = self.average;
        let variance = self
            .samples
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / self.samples.len() as f64;
        variance.sqrt()
    }

    /// Stutters still inside the rolling window.
    pub fn recent_stutter_count(&self) -> usize {
        self.samples
            .iter()
            .filter(|&&t| t > self.config.stutter_threshold_ms)
            .count()
    }

    /// Stutters since construction, including ones that left the window.
    pub fn stutter_count(&self) -> u64 {
        self.stutter_count
    }

    /// Timestamp of the most recent stutter.
    pub fn last_stutter_time(&self) -> Option<f64> {
        self.last_stutter_time
    }

    /// Most recently recorded frame time (ms).
    pub fn last_frame_time(&self) -> Option<f64> {
        self.samples.latest().copied()
    }

    /// Longest frame in the window, zero when empty.
    pub fn max_frame_time(&self) -> f64 {
        self.samples.iter().copied().fold(0.0, f64::max)
    }

    /// Shortest frame in the window, zero when empty.
    pub fn min_frame_time(&self) -> f64 {
        self.samples.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    /// Samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn config(&self) -> &FrameTrackerConfig {
        &self.config
    }

    /// Takes effect from the next recorded frame.
    pub fn set_stutter_threshold(&mut self, ms: f64) {
        self.config.stutter_threshold_ms = ms;
    }

    /// Takes effect from the next low-FPS check.
    pub fn set_min_fps(&mut self, fps: f64) {
        self.config.min_fps = fps;
    }

    /// Forget the window. The lifetime stutter counter is kept.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.average = 0.0;
        self.last_low_fps_report = None;
    }
}

impl Default for FrameTimeTracker {
    fn default() -> Self {
        Self::new(FrameTrackerConfig::default())
    }
}

/// Severity from `r = frame_time / threshold`: below 2x low, below 2.5x medium,
/// otherwise high.
///
/// The high cutoff sits at 2.5x rather than 3x so that a 250ms frame against
/// the default 100ms threshold already counts as a high-severity stutter.
/// Moving it back to 3x breaks that case.
pub fn stutter_severity(frame_time_ms: f64, threshold_ms: f64) -> Severity {
    if threshold_ms <= 0.0 {
        return Severity::High;
    }
    let ratio = frame_time_ms / threshold_ms;
    if ratio < 2.0 {
        Severity::Low
    } else if ratio < 2.5 {
        Severity::Medium
    } else {
        Severity::High
    }
}

fn low_fps_severity(fps: f64, min_fps: f64) -> Severity {
    if fps < min_fps * 0.5 {
        Severity::High
    } else if fps < min_fps * 0.75 {
        Severity::Medium
    } else {
        Severity::Low
    }
}
