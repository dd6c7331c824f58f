use frameguard_common::{ListenerId, ListenerResult, ListenerSet, RingBuffer};
use frameguard_monitor::{IssueKind, PerformanceIssue};
use serde::{Deserialize, Serialize};

use crate::level::QualityLevel;

/// Quality manager configuration.
///
/// The up and down thresholds are deliberately asymmetric; together with the
/// cooldown and stability gates they keep the level from flickering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Sustained FPS below this steps quality down.
    pub reduction_threshold: f64,
    /// FPS above this allows stepping quality up.
    pub recovery_threshold: f64,
    /// How long FPS must stay below `reduction_threshold` (ms).
    pub reduction_sustain_ms: f64,
    /// Minimum time since the last reduction before any increase (ms).
    pub stability_period_ms: f64,
    /// Minimum time between two automatic changes (ms).
    pub adjustment_cooldown_ms: f64,
    pub history_capacity: usize,
    /// Start at `Minimal` and ratchet up as headroom is proven.
    pub progressive_enhancement: bool,
    /// Initial level when no device hint is supplied.
    pub default_level: QualityLevel,
    pub min_level: QualityLevel,
    pub max_level: QualityLevel,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            reduction_threshold: 35.0,
            recovery_threshold: 50.0,
            reduction_sustain_ms: 1000.0,
            stability_period_ms: 30_000.0,
            adjustment_cooldown_ms: 5000.0,
            history_capacity: 50,
            progressive_enhancement: false,
            default_level: QualityLevel::Medium,
            min_level: QualityLevel::Minimal,
            max_level: QualityLevel::Ultra,
        }
    }
}

/// Why the level changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum TransitionReason {
    SustainedLowFps { fps: u32 },
    HighSeverityIssue { kind: IssueKind },
    Recovered { fps: u32 },
    Manual,
    OverrideCleared,
}

/// One applied level change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityChange {
    pub from: QualityLevel,
    pub to: QualityLevel,
    pub reason: TransitionReason,
    pub decided_at_ms: f64,
    pub applied_at_ms: f64,
}

/// Per-frame input to [`DynamicQualityManager::evaluate`].
#[derive(Debug, Clone, Copy)]
pub struct QualitySignal<'a> {
    pub now_ms: f64,
    pub fps: u32,
    /// Issues detected this frame.
    pub issues: &'a [PerformanceIssue],
    /// Whether the monitor's issue window is still open.
    pub issue_active: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingChange {
    to: QualityLevel,
    reason: TransitionReason,
    decided_at_ms: f64,
}

/// Hysteretic quality-level state machine.
///
/// Decisions made in [`evaluate`](Self::evaluate) are staged and only take
/// effect at the next [`begin_tick`](Self::begin_tick), so rendering
/// parameters never change halfway through an update.
pub struct DynamicQualityManager {
    config: QualityConfig,
    current: QualityLevel,
    pending: Option<PendingChange>,
    manual_override: Option<QualityLevel>,
    last_adjustment: Option<f64>,
    last_reduction: Option<f64>,
    low_fps_since: Option<f64>,
    history: RingBuffer<QualityChange>,
    listeners: ListenerSet<QualityChange>,
}

impl DynamicQualityManager {
    /// Build a manager. `device_hint` is the host's recommended starting
    /// level; progressive enhancement ignores it and starts at `Minimal`.
    pub fn new(config: QualityConfig, device_hint: Option<QualityLevel>) -> Self {
        let initial = if config.progressive_enhancement {
            QualityLevel::Minimal
        } else {
            device_hint.unwrap_or(config.default_level)
        };
        let current = initial.clamp(config.min_level, config.max_level.max(config.min_level));
        tracing::info!(level = %current, progressive = config.progressive_enhancement, "quality manager ready");
        Self {
            history: RingBuffer::new(config.history_capacity),
            config,
            current,
            pending: None,
            manual_override: None,
            last_adjustment: None,
            last_reduction: None,
            low_fps_since: None,
            listeners: ListenerSet::new(),
        }
    }

    /// Level in effect for the current tick.
    pub fn current(&self) -> QualityLevel {
        self.current
    }

    /// Level that will take effect at the next tick, if a change is staged.
    pub fn pending(&self) -> Option<QualityLevel> {
        self.pending.map(|p| p.to)
    }

    /// Apply any staged change. Call at the start of every tick.
    pub fn begin_tick(&mut self, now_ms: f64) -> Option<QualityChange> {
        let pending = self.pending.take()?;
        if pending.to == self.current {
            return None;
        }
        let change = QualityChange {
            from: self.current,
            to: pending.to,
            reason: pending.reason,
            decided_at_ms: pending.decided_at_ms,
            applied_at_ms: now_ms,
        };
        self.current = pending.to;
        self.history.push(change);
        tracing::info!(from = %change.from, to = %change.to, reason = ?change.reason, "quality level changed");
        self.listeners.emit(&change);
        Some(change)
    }

    /// Feed one frame's signal. Returns the level staged for the next tick,
    /// if this call decided a change.
    pub fn evaluate(&mut self, signal: QualitySignal<'_>) -> Option<QualityLevel> {
        let now = signal.now_ms;

        if signal.fps > 0 && (signal.fps as f64) < self.config.reduction_threshold {
            self.low_fps_since.get_or_insert(now);
        } else {
            self.low_fps_since = None;
        }

        if self.manual_override.is_some() || self.pending.is_some() {
            return None;
        }

        let cooled = self
            .last_adjustment
            .is_none_or(|t| now - t > self.config.adjustment_cooldown_ms);
        if !cooled {
            return None;
        }

        if let Some(reason) = self.reduction_reason(&signal) {
            let target = self.current.down().max(self.config.min_level);
            if target < self.current {
                self.stage(target, reason, now);
                self.last_reduction = Some(now);
                self.low_fps_since = None;
                return Some(target);
            }
            return None;
        }

        let stable = self
            .last_reduction
            .is_none_or(|t| now - t > self.config.stability_period_ms);
        if (signal.fps as f64) > self.config.recovery_threshold && stable && !signal.issue_active {
            let target = self.current.up().min(self.config.max_level);
            if target > self.current {
                self.stage(target, TransitionReason::Recovered { fps: signal.fps }, now);
                return Some(target);
            }
        }
        None
    }

    fn reduction_reason(&self, signal: &QualitySignal<'_>) -> Option<TransitionReason> {
        if let Some(issue) = signal.issues.iter().find(|i| i.is_high()) {
            return Some(TransitionReason::HighSeverityIssue { kind: issue.kind });
        }
        let sustained = self
            .low_fps_since
            .is_some_and(|since| signal.now_ms - since >= self.config.reduction_sustain_ms);
        sustained.then_some(TransitionReason::SustainedLowFps { fps: signal.fps })
    }

    fn stage(&mut self, to: QualityLevel, reason: TransitionReason, now_ms: f64) {
        tracing::debug!(from = %self.current, %to, ?reason, "quality change staged");
        self.pending = Some(PendingChange {
            to,
            reason,
            decided_at_ms: now_ms,
        });
        self.last_adjustment = Some(now_ms);
    }

    /// Pin the level and suspend automatic transitions until
    /// [`clear_manual_override`](Self::clear_manual_override).
    pub fn set_manual_level(&mut self, level: QualityLevel, now_ms: f64) {
        self.manual_override = Some(level);
        self.pending = Some(PendingChange {
            to: level,
            reason: TransitionReason::Manual,
            decided_at_ms: now_ms,
        });
    }

    /// Pin the level by index. Out-of-range requests are clamped.
    pub fn request_level_index(&mut self, index: i64, now_ms: f64) -> QualityLevel {
        let level = QualityLevel::from_index_clamped(index);
        if level.index() as i64 != index {
            tracing::warn!(requested = index, clamped = %level, "quality request clamped");
        }
        self.set_manual_level(level, now_ms);
        level
    }

    /// Resume automatic control. The cooldown restarts from now.
    pub fn clear_manual_override(&mut self, now_ms: f64) {
        if self.manual_override.take().is_some() {
            self.last_adjustment = Some(now_ms);
            self.low_fps_since = None;
            tracing::info!(level = %self.current, "manual quality override cleared");
        }
    }

    /// Level pinned by [`set_manual_level`](Self::set_manual_level), if any.
    pub fn manual_override(&self) -> Option<QualityLevel> {
        self.manual_override
    }

    /// Subscribe to applied level changes. Listeners run inside `begin_tick`.
    pub fn on_quality_change(
        &mut self,
        listener: impl FnMut(&QualityChange) -> ListenerResult + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    /// Returns false if `id` was not subscribed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Applied transitions, oldest first. Bounded.
    pub fn history(&self) -> &RingBuffer<QualityChange> {
        &self.history
    }

    /// When the last automatic change was decided.
    pub fn last_adjustment(&self) -> Option<f64> {
        self.last_adjustment
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }
}

impl std::fmt::Debug for DynamicQualityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicQualityManager")
            .field("current", &self.current)
            .field("pending", &self.pending)
            .field("manual_override", &self.manual_override)
            .field("transitions", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameguard_monitor::{PerformanceMetrics, Severity};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn signal(now_ms: f64, fps: u32) -> QualitySignal<'static> {
        QualitySignal {
            now_ms,
            fps,
            issues: &[],
            issue_active: false,
        }
    }

    fn high_issue(kind: IssueKind, now_ms: f64) -> PerformanceIssue {
        PerformanceIssue {
            kind,
            severity: Severity::High,
            timestamp_ms: now_ms,
            duration_ms: 0.0,
            observed: 0.0,
            metrics: PerformanceMetrics::default(),
        }
    }

    /// Drive one tick per 100ms: apply staged changes, then evaluate.
    fn drive(manager: &mut DynamicQualityManager, start_ms: f64, end_ms: f64, fps: u32) -> Vec<QualityChange> {
        let mut changes = Vec::new();
        let mut now = start_ms;
        while now < end_ms {
            changes.extend(manager.begin_tick(now));
            manager.evaluate(signal(now, fps));
            now += 100.0;
        }
        changes
    }

    #[test]
    fn starts_at_hint_or_default() {
        let m = DynamicQualityManager::new(QualityConfig::default(), None);
        assert_eq!(m.current(), QualityLevel::Medium);
        let m = DynamicQualityManager::new(QualityConfig::default(), Some(QualityLevel::High));
        assert_eq!(m.current(), QualityLevel::High);
    }

    #[test]
    fn progressive_mode_starts_minimal() {
        let config = QualityConfig {
            progressive_enhancement: true,
            ..QualityConfig::default()
        };
        let mut m = DynamicQualityManager::new(config, Some(QualityLevel::Ultra));
        assert_eq!(m.current(), QualityLevel::Minimal);

        let changes = drive(&mut m, 0.0, 60_000.0, 60);
        assert!(changes.iter().all(|c| c.to > c.from));
        assert_eq!(m.current(), QualityLevel::Ultra);
    }

    #[test]
    fn sustained_low_fps_reduces_one_level() {
        let mut m = DynamicQualityManager::new(QualityConfig::default(), Some(QualityLevel::High));
        // Below threshold, but not yet sustained.
        drive(&mut m, 0.0, 900.0, 30);
        assert_eq!(m.current(), QualityLevel::High);
        assert!(m.pending().is_none());

        let changes = drive(&mut m, 900.0, 1200.0, 30);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].to, QualityLevel::Medium);
        assert_eq!(changes[0].reason, TransitionReason::SustainedLowFps { fps: 30 });
    }

    #[test]
    fn change_applies_on_next_tick() {
        let mut m = DynamicQualityManager::new(QualityConfig::default(), Some(QualityLevel::High));
        let issues = [high_issue(IssueKind::MemoryPressure, 0.0)];
        let staged = m.evaluate(QualitySignal {
            now_ms: 0.0,
            fps: 60,
            issues: &issues,
            issue_active: true,
        });
        assert_eq!(staged, Some(QualityLevel::Medium));
        assert_eq!(m.current(), QualityLevel::High);

        let change = m.begin_tick(16.0).unwrap();
        assert_eq!(m.current(), QualityLevel::Medium);
        assert_eq!(change.decided_at_ms, 0.0);
        assert_eq!(change.applied_at_ms, 16.0);
        assert_eq!(
            change.reason,
            TransitionReason::HighSeverityIssue {
                kind: IssueKind::MemoryPressure
            }
        );
    }

    #[test]
    fn recovery_needs_stability_period_and_cooldown() {
        let mut m = DynamicQualityManager::new(QualityConfig::default(), Some(QualityLevel::High));
        drive(&mut m, 0.0, 1500.0, 20);
        assert_eq!(m.current(), QualityLevel::Medium);
        let reduced_at = m.last_adjustment().unwrap();

        // Good FPS, but inside the 30s stability period.
        let changes = drive(&mut m, 1500.0, reduced_at + 30_000.0, 58);
        assert!(changes.is_empty());

        let changes = drive(&mut m, reduced_at + 30_000.0, reduced_at + 31_000.0, 58);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].to, QualityLevel::High);
    }

    #[test]
    fn no_increase_while_issue_window_open() {
        let mut m = DynamicQualityManager::new(QualityConfig::default(), Some(QualityLevel::Low));
        for i in 0..100 {
            let now = i as f64 * 100.0;
            m.begin_tick(now);
            m.evaluate(QualitySignal {
                now_ms: now,
                fps: 60,
                issues: &[],
                issue_active: true,
            });
        }
        assert_eq!(m.current(), QualityLevel::Low);
    }

    #[test]
    fn fps_between_thresholds_holds_level() {
        let mut m = DynamicQualityManager::new(QualityConfig::default(), Some(QualityLevel::High));
        let changes = drive(&mut m, 0.0, 120_000.0, 42);
        assert!(changes.is_empty());
    }

    #[test]
    fn manual_override_pins_level() {
        let mut m = DynamicQualityManager::new(QualityConfig::default(), None);
        m.set_manual_level(QualityLevel::Ultra, 0.0);
        let changes = drive(&mut m, 0.0, 10_000.0, 10);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].reason, TransitionReason::Manual);
        assert_eq!(m.current(), QualityLevel::Ultra);

        m.clear_manual_override(10_000.0);
        drive(&mut m, 10_000.0, 17_000.0, 10);
        assert_eq!(m.current(), QualityLevel::High);
    }

    #[test]
    fn out_of_range_requests_are_clamped() {
        let mut m = DynamicQualityManager::new(QualityConfig::default(), None);
        assert_eq!(m.request_level_index(42, 0.0), QualityLevel::Ultra);
        m.begin_tick(1.0);
        assert_eq!(m.current(), QualityLevel::Ultra);
        assert_eq!(m.request_level_index(-3, 2.0), QualityLevel::Minimal);
        m.begin_tick(3.0);
        assert_eq!(m.current(), QualityLevel::Minimal);
    }

    #[test]
    fn floor_is_respected() {
        let mut m = DynamicQualityManager::new(QualityConfig::default(), Some(QualityLevel::Minimal));
        let changes = drive(&mut m, 0.0, 20_000.0, 5);
        assert!(changes.is_empty());
    }

    #[test]
    fn listeners_hear_applied_changes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut m = DynamicQualityManager::new(QualityConfig::default(), Some(QualityLevel::High));
        let sink = seen.clone();
        m.on_quality_change(move |c| {
            sink.borrow_mut().push(c.to);
            Ok(())
        });
        drive(&mut m, 0.0, 1500.0, 10);
        assert_eq!(*seen.borrow(), vec![QualityLevel::Medium]);
    }

    #[test]
    fn history_is_bounded() {
        let config = QualityConfig {
            history_capacity: 3,
            ..QualityConfig::default()
        };
        let mut m = DynamicQualityManager::new(config, None);
        for i in 0..10 {
            let level = if i % 2 == 0 { QualityLevel::Low } else { QualityLevel::High };
            m.set_manual_level(level, i as f64);
            m.begin_tick(i as f64 + 0.5);
        }
        assert_eq!(m.history().len(), 3);
        assert_eq!(m.history().latest().unwrap().to, QualityLevel::High);
    }

    #[test]
    fn random_traces_never_change_twice_within_cooldown() {
        let cooldown = QualityConfig::default().adjustment_cooldown_ms;
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut m = DynamicQualityManager::new(QualityConfig::default(), None);
            let mut decided = Vec::new();
            let mut now = 0.0;
            for _ in 0..5000 {
                now += rng.gen_range(5.0..120.0);
                if let Some(change) = m.begin_tick(now) {
                    decided.push(change.decided_at_ms);
                }
                let fps = rng.gen_range(5..90);
                let issues = if rng.gen_bool(0.01) {
                    vec![high_issue(IssueKind::Stutter, now)]
                } else {
                    Vec::new()
                };
                m.evaluate(QualitySignal {
                    now_ms: now,
                    fps,
                    issues: &issues,
                    issue_active: !issues.is_empty(),
                });
            }
            for pair in decided.windows(2) {
                assert!(pair[1] - pair[0] > cooldown, "seed {seed}: {pair:?}");
            }
        }
    }
}
