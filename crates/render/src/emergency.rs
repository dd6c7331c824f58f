use frameguard_monitor::PerformanceMetrics;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyState {
    Normal,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Accumulated bad signal needed to enter emergency mode.
    pub activation_delay_ms: f64,
    /// Accumulated good signal needed to leave it.
    pub deactivation_delay_ms: f64,
    /// Largest frame delta credited to an accumulator in one tick.
    pub max_step_ms: f64,
    pub fps_threshold: u32,
    pub frame_time_threshold_ms: f64,
    pub memory_threshold: f64,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            activation_delay_ms: 3_000.0,
            deactivation_delay_ms: 10_000.0,
            max_step_ms: 250.0,
            fps_threshold: 20,
            frame_time_threshold_ms: 200.0,
            memory_threshold: 0.9,
        }
    }
}

/// Inputs sampled once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmergencySignal {
    /// Zero means no frames recorded yet and is not treated as distress.
    pub fps: u32,
    pub last_frame_ms: f64,
    pub memory_usage: f64,
}

impl EmergencySignal {
    /// Build a signal from the monitor's snapshot and the last frame time.
    pub fn from_metrics(metrics: &PerformanceMetrics, last_frame_ms: f64) -> Self {
        Self {
            fps: metrics.current_fps,
            last_frame_ms,
            memory_usage: metrics.memory_usage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyTransition {
    pub from: EmergencyState,
    pub to: EmergencyState,
}

/// Two-state hysteresis layered over the quality levels.
///
/// Each tick credits the frame delta to the bad or good accumulator and
/// drains the other by the same amount. The guards only look at the
/// accumulators, so no single frame can flip the state.
#[derive(Debug, Clone)]
pub struct EmergencyMode {
    config: EmergencyConfig,
    state: EmergencyState,
    bad_ms: f64,
    good_ms: f64,
    activations: u64,
}

impl EmergencyMode {
    pub fn new(config: EmergencyConfig) -> Self {
        Self {
            config,
            state: EmergencyState::Normal,
            bad_ms: 0.0,
            good_ms: 0.0,
            activations: 0,
        }
    }

    /// Any single condition is enough. FPS 0 means no data yet and is ignored.
    pub fn is_distressed(&self, signal: &EmergencySignal) -> bool {
        (signal.fps > 0 && signal.fps < self.config.fps_threshold)
            || signal.last_frame_ms > self.config.frame_time_threshold_ms
            || signal.memory_usage > self.config.memory_threshold
    }

    /// Guard for Normal → Emergency.
    pub fn should_enter(&self) -> bool {
        self.state == EmergencyState::Normal && self.bad_ms >= self.config.activation_delay_ms
    }

    /// Guard for Emergency → Normal.
    pub fn should_exit(&self) -> bool {
        self.state == EmergencyState::Emergency && self.good_ms >= self.config.deactivation_delay_ms
    }

    /// Advance by one tick of `delta_ms`.
    pub fn update(&mut self, signal: &EmergencySignal, delta_ms: f64) -> Option<EmergencyTransition> {
        let step = if delta_ms.is_finite() {
            delta_ms.clamp(0.0, self.config.max_step_ms)
        } else {
            0.0
        };

        if self.is_distressed(signal) {
            self.bad_ms += step;
            self.good_ms = (self.good_ms - step).max(0.0);
        } else {
            self.good_ms += step;
            self.bad_ms = (self.bad_ms - step).max(0.0);
        }

        let from = self.state;
        if self.should_enter() {
            self.state = EmergencyState::Emergency;
            self.activations += 1;
            tracing::info!(
                fps = signal.fps,
                frame_ms = signal.last_frame_ms,
                memory = signal.memory_usage,
                "entering emergency mode"
            );
        } else if self.should_exit() {
            self.state = EmergencyState::Normal;
            tracing::info!(fps = signal.fps, "leaving emergency mode");
        } else {
            return None;
        }
        self.bad_ms = 0.0;
        self.good_ms = 0.0;
        Some(EmergencyTransition { from, to: self.state })
    }

    pub fn state(&self) -> EmergencyState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == EmergencyState::Emergency
    }

    /// Distress time accumulated toward entering.
    pub fn bad_signal_ms(&self) -> f64 {
        self.bad_ms
    }

    /// Healthy time accumulated toward leaving.
    pub fn good_signal_ms(&self) -> f64 {
        self.good_ms
    }

    /// Times emergency mode was entered.
    pub fn activations(&self) -> u64 {
        self.activations
    }

    pub fn config(&self) -> &EmergencyConfig {
        &self.config
    }

    /// Back to Normal with empty accumulators.
    pub fn reset(&mut self) {
        self.state = EmergencyState::Normal;
        self.bad_ms = 0.0;
        self.good_ms = 0.0;
    }
}

impl Default for EmergencyMode {
    fn default() -> Self {
        Self::new(EmergencyConfig::default())
    }
}
